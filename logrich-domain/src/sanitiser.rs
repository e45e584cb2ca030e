// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Enforces payload limits on an event before it proceeds further down the
//! pipeline, in four steps: the message, the event's own extras, the bound
//! context's extras, and an attached stack trace. Most limits truncate in
//! place; a payload whose extras still exceed `max_extras_total_bytes`
//! after truncation, or an overlong message with `truncate_message` off,
//! can't be sensibly partial-kept, so those two cases reject the whole
//! event instead.

use crate::event::{LogEvent, PayloadLimits};
use crate::value::Value;

const TRUNCATION_SUFFIX: &str = "...<truncated>";
const DEPTH_EXCEEDED_MARKER: &str = "<truncated>";

pub struct Sanitiser {
    limits: PayloadLimits,
}

/// Result of running an event through the sanitiser.
pub enum SanitiseOutcome {
    /// The event is fit to proceed; `truncated` says whether anything was
    /// cut in place (the pipeline reports this via the diagnostic hook).
    Accepted { truncated: bool },
    /// The event's extras still exceed `max_extras_total_bytes` after
    /// truncation; the pipeline must drop the whole event.
    Rejected { reason: String },
}

impl Sanitiser {
    pub fn new(limits: PayloadLimits) -> Self {
        Self { limits }
    }

    /// Applies limits in place. See [`SanitiseOutcome`].
    pub fn sanitise(&self, event: &mut LogEvent) -> SanitiseOutcome {
        let mut truncated = false;

        // Step 1: message.
        if event.message.len() > self.limits.max_message_len {
            if !self.limits.truncate_message {
                return SanitiseOutcome::Rejected {
                    reason: "message_too_long".to_string(),
                };
            }
            truncate_string(&mut event.message, self.limits.max_message_len);
            truncated = true;
        }

        // Step 2: event extras.
        if event.fields.len() > self.limits.max_field_count {
            let keep: Vec<String> = event.fields.keys().take(self.limits.max_field_count).cloned().collect();
            event.fields.retain(|k, _| keep.contains(k));
            truncated = true;
        }
        for value in event.fields.values_mut() {
            truncated |= self.sanitise_value(value, 0, self.limits.max_field_value_len);
        }
        let extras_bytes = serde_json::to_vec(&event.fields).map(|bytes| bytes.len()).unwrap_or(usize::MAX);
        if extras_bytes > self.limits.max_extras_total_bytes {
            return SanitiseOutcome::Rejected {
                reason: format!("extras serialise to {extras_bytes} bytes, exceeding the {} byte limit", self.limits.max_extras_total_bytes),
            };
        }

        // Step 3: context extras, same shape as step 2 but against the
        // context's own limits.
        if let Some(context) = event.context.as_mut() {
            if context.extra.len() > self.limits.context_max_keys {
                let keep: Vec<String> = context.extra.keys().take(self.limits.context_max_keys).cloned().collect();
                context.extra.retain(|k, _| keep.contains(k));
                truncated = true;
            }
            for value in context.extra.values_mut() {
                truncated |= self.sanitise_value(value, 0, self.limits.context_max_value_chars);
            }
        }

        // Step 4: stack trace, kept to its last N lines.
        if let Some(exc_info) = event.exc_info.as_mut() {
            let lines: Vec<&str> = exc_info.lines().collect();
            if lines.len() > self.limits.stacktrace_max_frames {
                let kept = lines[lines.len() - self.limits.stacktrace_max_frames..].join("\n");
                *exc_info = kept;
                truncated = true;
            }
        }

        SanitiseOutcome::Accepted { truncated }
    }

    fn sanitise_value(&self, value: &mut Value, depth: usize, max_value_chars: usize) -> bool {
        if depth >= self.limits.max_extra_depth {
            let had_children = !matches!(value, Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_));
            if had_children {
                *value = Value::String(DEPTH_EXCEEDED_MARKER.to_string());
                return true;
            }
            return false;
        }

        match value {
            Value::String(s) => {
                if s.len() > max_value_chars {
                    truncate_string(s, max_value_chars);
                    return true;
                }
                false
            }
            Value::Bytes(b) => {
                if b.len() > max_value_chars {
                    b.truncate(max_value_chars);
                    return true;
                }
                false
            }
            Value::List(items) => {
                let mut truncated = false;
                for item in items.iter_mut() {
                    truncated |= self.sanitise_value(item, depth + 1, max_value_chars);
                }
                truncated
            }
            Value::Map(map) => {
                let mut truncated = false;
                for v in map.values_mut() {
                    truncated |= self.sanitise_value(v, depth + 1, max_value_chars);
                }
                truncated
            }
            Value::Set(set) => {
                let mut truncated = false;
                let items: std::collections::BTreeSet<_> = set
                    .items
                    .iter()
                    .map(|item| {
                        let mut s = item.0.clone();
                        if s.len() > max_value_chars {
                            truncate_string(&mut s, max_value_chars);
                            truncated = true;
                        }
                        crate::value::OrdValue(s)
                    })
                    .collect();
                set.items = items;
                truncated
            }
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) => false,
        }
    }
}

fn truncate_string(s: &mut String, max_len: usize) {
    if max_len <= TRUNCATION_SUFFIX.len() {
        s.truncate(max_len);
        return;
    }
    let keep = max_len - TRUNCATION_SUFFIX.len();
    let boundary = s
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= keep)
        .last()
        .unwrap_or(0);
    s.truncate(boundary);
    s.push_str(TRUNCATION_SUFFIX);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_event() -> LogEvent {
        LogEvent::new("id-1".into(), Utc::now(), crate::levels::Severity::Info, "svc", "hello")
    }

    fn truncated(outcome: SanitiseOutcome) -> bool {
        match outcome {
            SanitiseOutcome::Accepted { truncated } => truncated,
            SanitiseOutcome::Rejected { reason } => panic!("expected Accepted, got Rejected({reason})"),
        }
    }

    #[test]
    fn long_message_is_truncated() {
        let limits = PayloadLimits {
            max_message_len: 10,
            ..PayloadLimits::default()
        };
        let sanitiser = Sanitiser::new(limits);
        let mut event = sample_event();
        event.message = "x".repeat(100);
        assert!(truncated(sanitiser.sanitise(&mut event)));
        assert!(event.message.len() <= 10);
        assert!(event.message.ends_with(TRUNCATION_SUFFIX) || event.message.len() == 10);
    }

    #[test]
    fn excess_fields_are_dropped() {
        let limits = PayloadLimits {
            max_field_count: 2,
            ..PayloadLimits::default()
        };
        let sanitiser = Sanitiser::new(limits);
        let mut event = sample_event()
            .with_field("a", 1i64)
            .with_field("b", 2i64)
            .with_field("c", 3i64);
        assert!(truncated(sanitiser.sanitise(&mut event)));
        assert_eq!(event.fields.len(), 2);
    }

    #[test]
    fn deeply_nested_values_are_collapsed() {
        let limits = PayloadLimits {
            max_extra_depth: 1,
            ..PayloadLimits::default()
        };
        let sanitiser = Sanitiser::new(limits);
        let mut event = sample_event().with_field(
            "nested",
            Value::List(vec![Value::List(vec![Value::Int(1)])]),
        );
        assert!(truncated(sanitiser.sanitise(&mut event)));
    }

    #[test]
    fn well_formed_event_is_untouched() {
        let sanitiser = Sanitiser::new(PayloadLimits::default());
        let mut event = sample_event();
        assert!(!truncated(sanitiser.sanitise(&mut event)));
    }

    #[test]
    fn extras_exceeding_total_byte_budget_are_rejected() {
        let limits = PayloadLimits {
            max_extras_total_bytes: 16,
            ..PayloadLimits::default()
        };
        let sanitiser = Sanitiser::new(limits);
        let mut event = sample_event().with_field("payload", "x".repeat(1024));
        match sanitiser.sanitise(&mut event) {
            SanitiseOutcome::Rejected { .. } => {}
            SanitiseOutcome::Accepted { .. } => panic!("expected Rejected"),
        }
    }

    #[test]
    fn overlong_message_is_rejected_when_truncation_is_disabled() {
        let limits = PayloadLimits {
            max_message_len: 10,
            truncate_message: false,
            ..PayloadLimits::default()
        };
        let sanitiser = Sanitiser::new(limits);
        let mut event = sample_event();
        event.message = "x".repeat(100);
        match sanitiser.sanitise(&mut event) {
            SanitiseOutcome::Rejected { reason } => assert_eq!(reason, "message_too_long"),
            SanitiseOutcome::Accepted { .. } => panic!("expected Rejected"),
        }
    }

    #[test]
    fn deeply_nested_values_are_collapsed_to_the_truncated_marker() {
        let limits = PayloadLimits {
            max_extra_depth: 1,
            ..PayloadLimits::default()
        };
        let sanitiser = Sanitiser::new(limits);
        let mut event = sample_event().with_field("nested", Value::List(vec![Value::List(vec![Value::Int(1)])]));
        sanitiser.sanitise(&mut event);
        match event.fields.get("nested").unwrap() {
            Value::List(items) => assert_eq!(items[0], Value::String(DEPTH_EXCEEDED_MARKER.to_string())),
            other => panic!("expected a list, got {other:?}"),
        }
    }

    #[test]
    fn oversized_set_members_are_truncated() {
        use std::collections::BTreeSet;

        use crate::value::{OrdValue, SetWrapper};

        let limits = PayloadLimits {
            max_field_value_len: 4,
            ..PayloadLimits::default()
        };
        let sanitiser = Sanitiser::new(limits);
        let mut items = BTreeSet::new();
        items.insert(OrdValue("abcdefgh".to_string()));
        let mut event = sample_event().with_field("tags", Value::Set(SetWrapper { items }));
        assert!(truncated(sanitiser.sanitise(&mut event)));
        match event.fields.get("tags").unwrap() {
            Value::Set(set) => assert!(set.items.iter().all(|v| v.0.len() <= 4)),
            other => panic!("expected a set, got {other:?}"),
        }
    }

    #[test]
    fn context_extras_exceeding_key_count_are_dropped() {
        use crate::context::ContextFrame;

        let limits = PayloadLimits {
            context_max_keys: 1,
            ..PayloadLimits::default()
        };
        let sanitiser = Sanitiser::new(limits);
        let context = ContextFrame::builder("svc").extra("a", 1i64).extra("b", 2i64).build().unwrap();
        let mut event = sample_event().with_context(context);
        assert!(truncated(sanitiser.sanitise(&mut event)));
        assert_eq!(event.context.unwrap().extra.len(), 1);
    }

    #[test]
    fn context_extra_values_are_truncated_to_their_own_limit() {
        use crate::context::ContextFrame;

        let limits = PayloadLimits {
            context_max_value_chars: 4,
            ..PayloadLimits::default()
        };
        let sanitiser = Sanitiser::new(limits);
        let context = ContextFrame::builder("svc").extra("note", "a very long value").build().unwrap();
        let mut event = sample_event().with_context(context);
        assert!(truncated(sanitiser.sanitise(&mut event)));
        let note = event.context.unwrap().extra.get("note").unwrap().as_str().unwrap().to_string();
        assert!(note.len() <= 4 || note.ends_with(TRUNCATION_SUFFIX));
    }

    #[test]
    fn stack_trace_keeps_only_the_last_frames() {
        let limits = PayloadLimits {
            stacktrace_max_frames: 2,
            ..PayloadLimits::default()
        };
        let sanitiser = Sanitiser::new(limits);
        let mut event = sample_event().with_exc_info("frame 1\nframe 2\nframe 3");
        assert!(truncated(sanitiser.sanitise(&mut event)));
        assert_eq!(event.exc_info.unwrap(), "frame 2\nframe 3");
    }
}

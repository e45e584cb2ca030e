// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Redacts sensitive values out of an event's fields and context extras
//! before they reach any sink, by key name pattern.
//!
//! A field whose key matches one of the configured patterns (case
//! insensitive: `password`, `token`, `secret`, `authorization`, ... by
//! default) has its value replaced with a fixed mask, recursively through
//! nested maps and lists. This runs after sanitisation so redaction doesn't
//! get partially truncated away.

use regex::Regex;

use crate::context::ContextFrame;
use crate::event::LogEvent;
use crate::value::Value;

pub const DEFAULT_MASK: &str = "***REDACTED***";

pub struct Scrubber {
    patterns: Vec<Regex>,
    mask: String,
}

impl Scrubber {
    /// Builds a scrubber from case-insensitive key-name patterns. Returns
    /// an error (surfaced as `InvalidConfiguration` by the caller) if any
    /// pattern fails to compile.
    pub fn new(key_patterns: &[&str], mask: impl Into<String>) -> Result<Self, regex::Error> {
        let patterns = key_patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            patterns,
            mask: mask.into(),
        })
    }

    pub fn default_patterns() -> Result<Self, regex::Error> {
        Self::new(
            &[
                "password",
                "passwd",
                "secret",
                "token",
                "api[_-]?key",
                "authorization",
                "cookie",
                "ssn",
                "credit[_-]?card",
            ],
            DEFAULT_MASK,
        )
    }

    fn key_matches(&self, key: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(key))
    }

    /// Scrubs an event's fields and context extras in place. Returns
    /// whether anything was redacted.
    pub fn scrub_event(&self, event: &mut LogEvent) -> bool {
        let mut redacted = self.scrub_map(&mut event.fields);
        if let Some(context) = event.context.as_mut() {
            redacted |= self.scrub_context(context);
        }
        redacted
    }

    pub fn scrub_context(&self, context: &mut ContextFrame) -> bool {
        self.scrub_map(&mut context.extra)
    }

    fn scrub_map(&self, map: &mut std::collections::BTreeMap<String, Value>) -> bool {
        let mut redacted = false;
        for (key, value) in map.iter_mut() {
            if self.key_matches(key) {
                *value = Value::String(self.mask.clone());
                redacted = true;
            } else {
                redacted |= self.scrub_value(value);
            }
        }
        redacted
    }

    fn scrub_value(&self, value: &mut Value) -> bool {
        match value {
            Value::Map(map) => self.scrub_map(map),
            Value::List(items) => {
                let mut redacted = false;
                for item in items.iter_mut() {
                    redacted |= self.scrub_value(item);
                }
                redacted
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_event() -> LogEvent {
        LogEvent::new("id-1".into(), Utc::now(), crate::levels::Severity::Info, "svc", "login")
    }

    #[test]
    fn redacts_matching_top_level_keys() {
        let scrubber = Scrubber::default_patterns().unwrap();
        let mut event = sample_event().with_field("password", "hunter2");
        assert!(scrubber.scrub_event(&mut event));
        assert_eq!(event.fields.get("password"), Some(&Value::String(DEFAULT_MASK.to_string())));
    }

    #[test]
    fn redacts_nested_keys() {
        let scrubber = Scrubber::default_patterns().unwrap();
        let mut nested = std::collections::BTreeMap::new();
        nested.insert("api_key".to_string(), Value::String("abc123".to_string()));
        let mut event = sample_event().with_field("headers", Value::Map(nested));
        assert!(scrubber.scrub_event(&mut event));
        if let Value::Map(map) = event.fields.get("headers").unwrap() {
            assert_eq!(map.get("api_key"), Some(&Value::String(DEFAULT_MASK.to_string())));
        } else {
            panic!("expected map");
        }
    }

    #[test]
    fn leaves_non_matching_keys_alone() {
        let scrubber = Scrubber::default_patterns().unwrap();
        let mut event = sample_event().with_field("username", "alice");
        assert!(!scrubber.scrub_event(&mut event));
        assert_eq!(event.fields.get("username"), Some(&Value::String("alice".to_string())));
    }

    #[test]
    fn redaction_is_keyed_by_field_name_not_list_value_content() {
        let scrubber = Scrubber::new(&["token"], "***").unwrap();

        let mut nested = std::collections::BTreeMap::new();
        nested.insert("token".to_string(), Value::String("xyz".to_string()));
        nested.insert("ok".to_string(), Value::String("keep".to_string()));

        let mut event = sample_event()
            .with_field("token", "abc")
            .with_field("nested", Value::Map(nested))
            .with_field(
                "list",
                Value::List(vec![Value::String("token-bearer".to_string())]),
            );

        assert!(scrubber.scrub_event(&mut event));
        assert_eq!(event.fields.get("token"), Some(&Value::String("***".to_string())));
        assert_eq!(
            event.fields.get("list"),
            Some(&Value::List(vec![Value::String("token-bearer".to_string())]))
        );
        if let Value::Map(map) = event.fields.get("nested").unwrap() {
            assert_eq!(map.get("token"), Some(&Value::String("***".to_string())));
            assert_eq!(map.get("ok"), Some(&Value::String("keep".to_string())));
        } else {
            panic!("expected map");
        }
    }
}

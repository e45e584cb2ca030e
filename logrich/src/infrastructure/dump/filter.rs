// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Event selection for dumps: minimum severity plus predicates over
//! context fields and extras.

use logrich_domain::event::LogEvent;
use logrich_domain::levels::Severity;
use regex::Regex;

/// A single field predicate. `Regex` is opt-in at the call site (the
/// variant itself requires an already-compiled pattern; nothing in this
/// module silently treats a plain string as a pattern).
#[derive(Debug, Clone)]
pub enum FieldPredicate {
    Exact(String),
    Substring(String),
    SubstringCaseInsensitive(String),
    Regex(Regex),
}

impl FieldPredicate {
    fn matches(&self, value: &str) -> bool {
        match self {
            FieldPredicate::Exact(expected) => value == expected,
            FieldPredicate::Substring(needle) => value.contains(needle.as_str()),
            FieldPredicate::SubstringCaseInsensitive(needle) => {
                value.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
            }
            FieldPredicate::Regex(re) => re.is_match(value),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DumpFilter {
    pub min_severity: Option<Severity>,
    pub context_predicates: Vec<(String, FieldPredicate)>,
    pub extra_predicates: Vec<(String, FieldPredicate)>,
}

impl DumpFilter {
    pub fn matches(&self, event: &LogEvent) -> bool {
        if let Some(min) = self.min_severity {
            if event.severity < min {
                return false;
            }
        }
        for (field, predicate) in &self.context_predicates {
            let value = context_field(event, field);
            if !value.map(|v| predicate.matches(&v)).unwrap_or(false) {
                return false;
            }
        }
        for (key, predicate) in &self.extra_predicates {
            let value = event.fields.get(key).and_then(|v| v.as_str());
            if !value.map(|v| predicate.matches(v)).unwrap_or(false) {
                return false;
            }
        }
        true
    }
}

fn context_field(event: &LogEvent, field: &str) -> Option<String> {
    let context = event.context.as_ref()?;
    match field {
        "service" => Some(context.service.clone()),
        "environment" => context.environment.clone(),
        "job_id" => context.job_id.clone(),
        "request_id" => context.request_id.clone(),
        "user_id" => context.user_id.clone(),
        "trace_id" => context.trace_id.clone(),
        "span_id" => context.span_id.clone(),
        other => context.extra.get(other).and_then(|v| v.as_str()).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use logrich_domain::context::ContextFrame;

    fn event_with_env(env: &str) -> LogEvent {
        let context = ContextFrame::builder("svc").environment(env).build().unwrap();
        LogEvent::new("id-1".into(), Utc::now(), Severity::Warning, "svc", "x").with_context(context)
    }

    #[test]
    fn min_severity_excludes_lower_events() {
        let filter = DumpFilter {
            min_severity: Some(Severity::Error),
            ..Default::default()
        };
        assert!(!filter.matches(&event_with_env("prod")));
    }

    #[test]
    fn substring_predicate_matches_context_field() {
        let filter = DumpFilter {
            context_predicates: vec![("environment".to_string(), FieldPredicate::Substring("ro".to_string()))],
            ..Default::default()
        };
        assert!(filter.matches(&event_with_env("production")));
        assert!(!filter.matches(&event_with_env("staging")));
    }
}

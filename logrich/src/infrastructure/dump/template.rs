// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Text template rendering: placeholder substitution for the TEXT dump
//! format and for `ConsoleSink`, which reuses this module rather than
//! having its own rendering logic.

use logrich_domain::error::LogRichError;
use logrich_domain::event::LogEvent;
use logrich_domain::levels::Severity;

use super::theme::Theme;

/// Resolves a named format preset to its literal template. `None` for an
/// unrecognised name (caller falls back to treating the name itself as a
/// literal template).
pub fn resolve_preset(name: &str) -> Option<&'static str> {
    match name {
        "full" => Some("{timestamp} {LEVEL} {logger_name} {event_id} {message} {context_fields}"),
        "short" => Some("{level_code}|{message}"),
        "full_loc" => Some("{timestamp} {LEVEL} [{logger_name}] {message} {context_fields}"),
        "short_loc" => Some("{level_icon} {message}"),
        _ => None,
    }
}

fn level_code(severity: Severity) -> &'static str {
    match severity {
        Severity::Debug => "DEBU",
        Severity::Info => "INFO",
        Severity::Warning => "WARN",
        Severity::Error => "ERRO",
        Severity::Critical => "CRIT",
    }
}

fn level_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Debug => "○",
        Severity::Info => "●",
        Severity::Warning => "▲",
        Severity::Error => "✖",
        Severity::Critical => "☠",
    }
}

fn context_fields_joined(event: &LogEvent) -> String {
    let Some(context) = &event.context else {
        return String::new();
    };
    let mut parts = Vec::new();
    parts.push(format!("service={}", context.service));
    if let Some(v) = &context.environment {
        parts.push(format!("environment={v}"));
    }
    if let Some(v) = &context.job_id {
        parts.push(format!("job_id={v}"));
    }
    if let Some(v) = &context.request_id {
        parts.push(format!("request_id={v}"));
    }
    if let Some(v) = &context.user_id {
        parts.push(format!("user_id={v}"));
    }
    if let Some(v) = &context.trace_id {
        parts.push(format!("trace_id={v}"));
    }
    if let Some(v) = &context.span_id {
        parts.push(format!("span_id={v}"));
    }
    parts.join(" ")
}

fn placeholder_value(event: &LogEvent, name: &str) -> Option<String> {
    let ts = event.timestamp;
    Some(match name {
        "timestamp" => ts.to_rfc3339(),
        "YYYY" => ts.format("%Y").to_string(),
        "MM" => ts.format("%m").to_string(),
        "DD" => ts.format("%d").to_string(),
        "hh" => ts.format("%H").to_string(),
        "mm" => ts.format("%M").to_string(),
        "ss" => ts.format("%S").to_string(),
        "level" => event.severity.as_str().to_ascii_lowercase(),
        "LEVEL" => event.severity.as_str().to_string(),
        "level_code" => level_code(event.severity).to_string(),
        "level_icon" => level_icon(event.severity).to_string(),
        "logger_name" => event.logger_name.clone(),
        "event_id" => event.id.clone(),
        "message" => event.message.clone(),
        "context" => event
            .context
            .as_ref()
            .map(|c| serde_json::to_string(c).unwrap_or_default())
            .unwrap_or_default(),
        "extra" => serde_json::to_string(&event.fields).unwrap_or_default(),
        "context_fields" => context_fields_joined(event),
        "service" => event.context.as_ref().map(|c| c.service.clone()).unwrap_or_default(),
        "environment" => event
            .context
            .as_ref()
            .and_then(|c| c.environment.clone())
            .unwrap_or_default(),
        "job_id" => event.context.as_ref().and_then(|c| c.job_id.clone()).unwrap_or_default(),
        "request_id" => event
            .context
            .as_ref()
            .and_then(|c| c.request_id.clone())
            .unwrap_or_default(),
        "user_id" => event.context.as_ref().and_then(|c| c.user_id.clone()).unwrap_or_default(),
        "trace_id" => event.context.as_ref().and_then(|c| c.trace_id.clone()).unwrap_or_default(),
        "span_id" => event.context.as_ref().and_then(|c| c.span_id.clone()).unwrap_or_default(),
        _ => return None,
    })
}

/// Renders one event through `template`, wrapping the whole line in the
/// severity's ANSI style when `color` is set. Fails with
/// `LogRichError::DumpFailed` on any `{placeholder}` the event can't supply.
pub fn render_line(event: &LogEvent, template: &str, theme: &Theme, color: bool) -> Result<String, LogRichError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find('}') else {
            out.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let name = &after_open[..close];
        match placeholder_value(event, name) {
            Some(value) => out.push_str(&value),
            None => return Err(LogRichError::DumpFailed(format!("unknown template placeholder: {{{name}}}"))),
        }
        rest = &after_open[close + 1..];
    }
    out.push_str(rest);

    if color {
        Ok(theme.wrap(event.severity, &out))
    } else {
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event() -> LogEvent {
        LogEvent::new("id-1".into(), Utc::now(), Severity::Warning, "svc", "disk nearly full")
    }

    #[test]
    fn short_preset_matches_level_code_pipe_message() {
        let template = resolve_preset("short").unwrap();
        let line = render_line(&event(), template, &Theme::default(), false).unwrap();
        assert_eq!(line, "WARN|disk nearly full");
    }

    #[test]
    fn unknown_placeholder_fails_the_render() {
        let err = render_line(&event(), "{bogus}", &Theme::default(), false).unwrap_err();
        assert!(matches!(err, LogRichError::DumpFailed(_)));
    }
}

// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Renders ring-buffer snapshots into one of four formats: plain text
//! (templated, optionally colourised), a JSON array, an HTML table, or
//! HTML with per-line styling.

pub mod filter;
pub mod template;
pub mod theme;

use std::path::Path;

use logrich_domain::error::LogRichError;
use logrich_domain::event::LogEvent;
use serde::{Deserialize, Serialize};

pub use filter::{DumpFilter, FieldPredicate};
pub use theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DumpFormat {
    Text,
    Json,
    HtmlTable,
    HtmlStyled,
}

pub struct DumpOptions {
    pub format: DumpFormat,
    /// A preset name (resolved via [`template::resolve_preset`]) or a
    /// literal template string. Only consulted for `Text`.
    pub template: Option<String>,
    pub theme: Theme,
    pub color: bool,
    pub filter: DumpFilter,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            format: DumpFormat::Text,
            template: None,
            theme: Theme::default(),
            color: false,
            filter: DumpFilter::default(),
        }
    }
}

/// Renders `events` (already filtered to the desired min severity by the
/// caller, or filtered here via `options.filter`) into the requested
/// format.
pub fn render(events: &[LogEvent], options: &DumpOptions) -> Result<String, LogRichError> {
    let selected: Vec<&LogEvent> = events.iter().filter(|e| options.filter.matches(e)).collect();
    match options.format {
        DumpFormat::Text => render_text(&selected, options),
        DumpFormat::Json => render_json(&selected),
        DumpFormat::HtmlTable => Ok(render_html_table(&selected)),
        DumpFormat::HtmlStyled => render_html_styled(&selected, options),
    }
}

fn resolve_template(options: &DumpOptions) -> &str {
    let requested = options.template.as_deref().unwrap_or("short");
    template::resolve_preset(requested).unwrap_or(requested)
}

fn render_text(events: &[&LogEvent], options: &DumpOptions) -> Result<String, LogRichError> {
    let tpl = resolve_template(options);
    let mut lines = Vec::with_capacity(events.len());
    for event in events {
        lines.push(template::render_line(event, tpl, &options.theme, options.color)?);
    }
    Ok(lines.join("\n"))
}

fn render_json(events: &[&LogEvent]) -> Result<String, LogRichError> {
    serde_json::to_string_pretty(events).map_err(|err| LogRichError::DumpFailed(err.to_string()))
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_html_table(events: &[&LogEvent]) -> String {
    let mut rows = String::new();
    for event in events {
        let context = event.context.as_ref();
        let pid_chain = context
            .map(|c| c.process_id_chain.iter().map(u32::to_string).collect::<Vec<_>>().join(">"))
            .unwrap_or_default();
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            html_escape(&event.timestamp.to_rfc3339()),
            html_escape(event.severity.as_str()),
            html_escape(&event.logger_name),
            html_escape(&event.message),
            html_escape(context.and_then(|c| c.user_id.as_deref()).unwrap_or("")),
            html_escape(context.and_then(|c| c.hostname.as_deref()).unwrap_or("")),
            context.and_then(|c| c.process_id).map(|pid| pid.to_string()).unwrap_or_default(),
            html_escape(&pid_chain),
        ));
    }
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"></head><body>\n<table>\n<thead><tr><th>timestamp</th><th>level</th><th>logger</th><th>message</th><th>user</th><th>host</th><th>pid</th><th>pid chain</th></tr></thead>\n<tbody>\n{rows}</tbody>\n</table>\n</body></html>\n"
    )
}

fn render_html_styled(events: &[&LogEvent], options: &DumpOptions) -> Result<String, LogRichError> {
    let mut lines = String::new();
    for event in events {
        let tpl = resolve_template(options);
        let text = template::render_line(event, tpl, &options.theme, false)?;
        lines.push_str(&format!(
            "<div style=\"color: {}\">{}</div>\n",
            options.theme.css_color(event.severity),
            html_escape(&text)
        ));
    }
    Ok(format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"></head><body>\n{lines}</body></html>\n"
    ))
}

/// Renders then writes UTF-8 to `path`, creating parent directories if
/// absent.
pub fn write_to_path(path: &Path, contents: &str) -> Result<(), LogRichError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|err| LogRichError::DumpFailed(err.to_string()))?;
        }
    }
    std::fs::write(path, contents).map_err(|err| LogRichError::DumpFailed(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use logrich_domain::levels::Severity;

    fn events() -> Vec<LogEvent> {
        vec![
            LogEvent::new("1".into(), Utc::now(), Severity::Info, "svc", "info msg"),
            LogEvent::new("2".into(), Utc::now(), Severity::Warning, "svc", "warn msg"),
            LogEvent::new("3".into(), Utc::now(), Severity::Error, "svc", "error msg"),
        ]
    }

    #[test]
    fn json_dump_round_trips_with_min_severity_filter() {
        let options = DumpOptions {
            format: DumpFormat::Json,
            filter: DumpFilter {
                min_severity: Some(Severity::Warning),
                ..Default::default()
            },
            ..Default::default()
        };
        let rendered = render(&events(), &options).unwrap();
        let parsed: Vec<LogEvent> = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed.iter().all(|e| e.severity >= Severity::Warning));
    }

    #[test]
    fn text_dump_with_short_template_matches_level_code_format() {
        let options = DumpOptions {
            format: DumpFormat::Text,
            template: Some("short".to_string()),
            filter: DumpFilter {
                min_severity: Some(Severity::Warning),
                ..Default::default()
            },
            ..Default::default()
        };
        let rendered = render(&events(), &options).unwrap();
        for line in rendered.lines() {
            assert!(
                line.starts_with("WARN|") || line.starts_with("ERRO|"),
                "unexpected line: {line}"
            );
        }
    }

    #[test]
    fn html_table_contains_one_row_per_event() {
        let rendered = render_html_table(&events().iter().collect::<Vec<_>>());
        assert_eq!(rendered.matches("<tr>").count() - 1, 3);
    }
}

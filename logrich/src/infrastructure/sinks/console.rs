// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Terminal sink: renders each event through the same template engine the
//! dump renderer uses, writing to stdout (or stderr for `Error`/`Critical`,
//! matching the convention of separating normal output from failure
//! output on a terminal).

use std::io::Write;

use logrich_domain::error::LogRichError;
use logrich_domain::event::LogEvent;
use logrich_domain::levels::Severity;
use logrich_domain::sink::Sink;

use crate::infrastructure::dump::template;
use crate::infrastructure::dump::theme::Theme;

pub struct ConsoleSink {
    template: String,
    theme: Theme,
    color: bool,
}

impl ConsoleSink {
    pub fn new(template: impl Into<String>, theme: Theme, color: bool) -> Self {
        Self {
            template: template.into(),
            theme,
            color,
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new("short", Theme::default(), true)
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn write(&self, event: &LogEvent) -> Result<(), LogRichError> {
        let resolved = template::resolve_preset(&self.template).unwrap_or(&self.template);
        let line = template::render_line(event, resolved, &self.theme, self.color)?;
        let result = if event.severity >= Severity::Error {
            writeln!(std::io::stderr(), "{line}")
        } else {
            writeln!(std::io::stdout(), "{line}")
        };
        result.map_err(|err| LogRichError::sink_unavailable("console", err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn writes_without_error_for_every_severity() {
        let sink = ConsoleSink::default();
        for severity in Severity::ALL {
            let event = LogEvent::new("id-1".into(), Utc::now(), severity, "svc", "hello");
            sink.write(&event).unwrap();
        }
    }
}

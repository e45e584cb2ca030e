// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Severity-to-style mapping for coloured TEXT dumps and the console sink.
//!
//! Lookup order is explicit-per-level override, falling back to the
//! built-in default palette.

use std::collections::BTreeMap;

use logrich_domain::levels::Severity;

const RESET: &str = "\x1b[0m";

fn default_ansi(severity: Severity) -> &'static str {
    match severity {
        Severity::Debug => "\x1b[36m",
        Severity::Info => "\x1b[32m",
        Severity::Warning => "\x1b[33m",
        Severity::Error => "\x1b[31m",
        Severity::Critical => "\x1b[1;31m",
    }
}

/// A named colour palette. `styles` holds overrides keyed by the
/// upper-case severity name (`"WARNING"`); anything absent falls back to
/// [`default_ansi`].
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    pub styles: BTreeMap<String, String>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            styles: BTreeMap::new(),
        }
    }
}

impl Theme {
    pub fn new(name: impl Into<String>, styles: BTreeMap<String, String>) -> Self {
        Self { name: name.into(), styles }
    }

    fn ansi_for(&self, severity: Severity) -> String {
        self.styles
            .get(severity.as_str())
            .cloned()
            .unwrap_or_else(|| default_ansi(severity).to_string())
    }

    /// Wraps `text` in the ANSI escape for `severity`, resetting afterward.
    pub fn wrap(&self, severity: Severity, text: &str) -> String {
        format!("{}{}{}", self.ansi_for(severity), text, RESET)
    }

    /// A CSS colour value for the HTML_STYLED format, reusing the same
    /// override table (values there are expected to be CSS colours, not
    /// ANSI codes, when a theme is built for HTML output).
    pub fn css_color(&self, severity: Severity) -> String {
        self.styles.get(severity.as_str()).cloned().unwrap_or_else(|| {
            match severity {
                Severity::Debug => "#1f9edb",
                Severity::Info => "#2e8b3d",
                Severity::Warning => "#c99a20",
                Severity::Error => "#c0392b",
                Severity::Critical => "#7b0a0a",
            }
            .to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_palette_wraps_with_reset() {
        let theme = Theme::default();
        let wrapped = theme.wrap(Severity::Error, "boom");
        assert!(wrapped.starts_with("\x1b["));
        assert!(wrapped.ends_with(RESET));
    }

    #[test]
    fn explicit_override_takes_precedence() {
        let mut styles = BTreeMap::new();
        styles.insert("ERROR".to_string(), "\x1b[35m".to_string());
        let theme = Theme::new("custom", styles);
        assert_eq!(theme.wrap(Severity::Error, "x"), "\x1b[35mx\x1b[0m");
    }
}

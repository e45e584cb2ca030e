// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Runtime configuration: layered defaults → optional file → environment
//! variables, all under the `config` crate, deserialised into a single
//! [`RuntimeConfig`] that the composition root builds the process-wide
//! runtime from.
//!
//! Layering order (later layers win): built-in defaults (`#[serde(default
//! = ...)]` on every field below), an optional TOML file named by the
//! `LOGRICH_CONFIG_FILE` environment variable, then `LOGRICH_*`-prefixed
//! environment variables. Anything that fails to parse at any layer
//! surfaces as `InvalidConfiguration` at `from_env()` time; there is no
//! silent fallback to the default for a value that was present but
//! malformed.

use std::collections::BTreeMap;
use std::time::Duration;

use config::{Config, Environment, File};
use logrich_domain::error::LogRichError;
use logrich_domain::event::PayloadLimits;
use logrich_domain::levels::Severity;
use logrich_domain::rate_limiter::RateLimitRule;
use serde::{Deserialize, Serialize};

use crate::infrastructure::dump::DumpFormat;
use crate::infrastructure::queue::QueuePolicy;

/// Environment variable naming the optional TOML file to layer under the
/// environment overrides. Not itself overridable via `LOGRICH_*` — it has
/// to be read before the env layer exists.
pub const CONFIG_FILE_ENV_VAR: &str = "LOGRICH_CONFIG_FILE";

/// Fixed prefix every environment override must carry, e.g.
/// `LOGRICH_CONSOLE_LEVEL=DEBUG`.
pub const ENV_PREFIX: &str = "LOGRICH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraylogProtocol {
    Tcp,
    Udp,
}

impl Default for GraylogProtocol {
    fn default() -> Self {
        GraylogProtocol::Udp
    }
}

fn default_console_level() -> Severity {
    Severity::Info
}

fn default_backend_level() -> Severity {
    Severity::Info
}

fn default_ring_buffer_size() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

fn default_queue_maxsize() -> usize {
    1024
}

fn default_queue_policy() -> QueuePolicy {
    QueuePolicy::Block
}

fn default_queue_timeout_ms() -> u64 {
    500
}

fn default_queue_stop_timeout_ms() -> u64 {
    5_000
}

fn default_console_format_preset() -> String {
    "short".to_string()
}

fn default_dump_format_preset() -> String {
    "short".to_string()
}

fn default_dump_format() -> DumpFormat {
    DumpFormat::Text
}

fn default_rate_limit_max_events() -> usize {
    100
}

fn default_rate_limit_window_seconds() -> u64 {
    1
}

fn default_payload_limits() -> PayloadLimits {
    PayloadLimits::default()
}

/// The fully deserialised, layered runtime configuration. Field names here
/// are the `snake_case` keys a file layer or `LOGRICH_<UPPER_SNAKE>`
/// environment variable sets.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    pub service: String,
    pub environment: String,

    #[serde(default = "default_console_level")]
    pub console_level: Severity,
    #[serde(default = "default_backend_level")]
    pub backend_level: Severity,
    #[serde(default = "default_backend_level")]
    pub graylog_level: Severity,

    #[serde(default = "default_true")]
    pub enable_ring_buffer: bool,
    #[serde(default = "default_ring_buffer_size")]
    pub ring_buffer_size: usize,

    #[serde(default)]
    pub enable_journal: bool,
    #[serde(default)]
    pub enable_eventlog: bool,
    #[serde(default)]
    pub enable_graylog: bool,

    #[serde(default)]
    pub graylog_host: Option<String>,
    #[serde(default)]
    pub graylog_port: Option<u16>,
    #[serde(default)]
    pub graylog_protocol: GraylogProtocol,
    #[serde(default)]
    pub graylog_tls: bool,

    #[serde(default = "default_true")]
    pub queue_enabled: bool,
    #[serde(default = "default_queue_maxsize")]
    pub queue_maxsize: usize,
    #[serde(default = "default_queue_policy")]
    pub queue_full_policy: QueuePolicy,
    #[serde(default = "default_queue_timeout_ms")]
    pub queue_put_timeout_ms: u64,
    #[serde(default = "default_queue_stop_timeout_ms")]
    pub queue_stop_timeout_ms: u64,

    #[serde(default)]
    pub force_color: bool,
    #[serde(default)]
    pub no_color: bool,
    #[serde(default)]
    pub console_theme: Option<String>,
    #[serde(default)]
    pub console_styles: BTreeMap<String, String>,

    #[serde(default = "default_console_format_preset")]
    pub console_format_preset: String,
    #[serde(default)]
    pub console_format_template: Option<String>,

    /// Which of the four renderers `dump()` uses when the caller doesn't
    /// pass an explicit format.
    #[serde(default = "default_dump_format")]
    pub dump_format: DumpFormat,
    #[serde(default = "default_dump_format_preset")]
    pub dump_format_preset: String,
    #[serde(default)]
    pub dump_format_template: Option<String>,

    #[serde(default)]
    pub scrub_patterns: Vec<String>,

    #[serde(default = "default_rate_limit_max_events")]
    pub rate_limit_max_events: usize,
    #[serde(default = "default_rate_limit_window_seconds")]
    pub rate_limit_window_seconds: u64,

    #[serde(default = "default_payload_limits")]
    pub payload_limits: PayloadLimits,
}

impl RuntimeConfig {
    /// Builds the layered configuration: defaults, then a TOML file layer
    /// if `LOGRICH_CONFIG_FILE` names one (the variable being unset means
    /// no file layer at all; set-but-unreadable is a configuration error,
    /// not silently skipped), then `LOGRICH_*` environment variables. Any
    /// parse failure at any layer is reported as `InvalidConfiguration`.
    pub fn from_env() -> Result<Self, LogRichError> {
        let mut builder = Config::builder();

        if let Ok(path) = std::env::var(CONFIG_FILE_ENV_VAR) {
            builder = builder.add_source(File::with_name(&path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("scrub_patterns")
                .try_parsing(true),
        );

        let built = builder
            .build()
            .map_err(|err| LogRichError::invalid_config(err.to_string()))?;

        built
            .try_deserialize::<RuntimeConfig>()
            .map_err(|err| LogRichError::invalid_config(err.to_string()))
    }

    /// `scrub_patterns` merged with the scrubber's built-in defaults,
    /// de-duplicated while preserving the configured patterns first.
    pub fn effective_scrub_patterns(&self) -> Vec<String> {
        const BUILTIN: [&str; 3] = ["password", "secret", "token"];
        let mut merged = self.scrub_patterns.clone();
        for builtin in BUILTIN {
            if !merged.iter().any(|p| p.eq_ignore_ascii_case(builtin)) {
                merged.push(builtin.to_string());
            }
        }
        merged
    }

    pub fn rate_limit_rule(&self) -> RateLimitRule {
        RateLimitRule {
            max_events: self.rate_limit_max_events,
            interval: Duration::from_secs(self.rate_limit_window_seconds),
        }
    }

    pub fn queue_put_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_put_timeout_ms)
    }

    pub fn queue_stop_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_stop_timeout_ms)
    }

    /// Whether colour should be used for the console sink: `force_color`
    /// wins outright, otherwise `no_color` vetoes, otherwise colour is on
    /// by default.
    pub fn console_color(&self) -> bool {
        self.force_color || !self.no_color
    }
}

// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Builds the runtime from a [`RuntimeConfig`] and installs it as a
//! process-wide singleton.
//!
//! Grounded on the teacher's `infrastructure::runtime::resource_manager`
//! global-singleton pattern (`OnceLock` + free functions `init_x`/`x()`
//! rather than a struct method), adapted to support `shutdown()` and
//! re-`init()`, which the teacher's CPU/IO token manager never needed — a
//! plain `OnceLock` can only be set once for the life of the process, so
//! the cell here is a `parking_lot::RwLock<Option<Arc<RuntimeHandle>>>`
//! instead: many concurrent readers (`get`/`bind`/`dump`/`is_initialised`)
//! against a single writer that only runs at `init`/`shutdown`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use logrich_bootstrap::Platform;
use logrich_domain::context::ContextFrame;
use logrich_domain::diagnostics::DiagnosticHook;
use logrich_domain::error::LogRichError;
use logrich_domain::event::LogEvent;
use logrich_domain::levels::Severity;
use logrich_domain::ports::{Clock, IdProvider};
use logrich_domain::scrubber::{self, Scrubber};
use logrich_domain::sink::Sink;
use logrich_domain::value::Value;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::application::context_stack;
use crate::application::pipeline::{Outcome, Pipeline, PipelineConfig};
use crate::infrastructure::dump::theme::Theme;
use crate::infrastructure::queue::{QueueConfig, QueueWorker};
use crate::infrastructure::sinks::console::ConsoleSink;
use crate::infrastructure::sinks::eventlog::EventLogSink;
use crate::infrastructure::sinks::gelf::GelfSink;
use crate::infrastructure::sinks::ThresholdSink;
use crate::runtime::config::{GraylogProtocol, RuntimeConfig};

/// The real-time [`Clock`]: wall-clock UTC.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The real [`IdProvider`]: 128-bit random ids rendered as lowercase hex,
/// per the port's documented reference realisation.
pub struct UuidIdProvider;

impl IdProvider for UuidIdProvider {
    fn next_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// What happened to a submitted event, at the point `submit` returns —
/// before the queue worker (if any) has actually dispatched it to sinks.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Accepted onto the bounded queue; fan-out happens asynchronously.
    Queued,
    /// The queue was full and the configured policy dropped the event.
    QueueFull,
    /// Processed inline (no queue configured) with the given pipeline
    /// outcome.
    Processed(Outcome),
}

impl SubmitOutcome {
    pub fn ok(&self) -> bool {
        match self {
            SubmitOutcome::Queued => true,
            SubmitOutcome::QueueFull => false,
            SubmitOutcome::Processed(outcome) => matches!(outcome, Outcome::Emitted),
        }
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            SubmitOutcome::Queued => None,
            SubmitOutcome::QueueFull => Some("queue_full"),
            SubmitOutcome::Processed(Outcome::Emitted) => None,
            SubmitOutcome::Processed(Outcome::RateLimited) => Some("rate_limited"),
            SubmitOutcome::Processed(Outcome::BelowThreshold) => Some("below_threshold"),
            SubmitOutcome::Processed(Outcome::Rejected) => Some("payload_rejected"),
        }
    }
}

/// Everything the public API needs to submit events, bind context, and
/// dump the ring buffer, bundled behind one process-wide handle.
pub struct RuntimeHandle {
    pipeline: Arc<Pipeline>,
    queue: Option<QueueWorker>,
    queue_stop_timeout: Duration,
    clock: Arc<dyn Clock>,
    id_provider: Arc<dyn IdProvider>,
    platform: Arc<dyn Platform>,
    config: RuntimeConfig,
}

impl RuntimeHandle {
    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Stamps id/timestamp/ambient context onto a new event and hands it
    /// either to the queue (if configured) or straight through the
    /// pipeline.
    pub fn submit(
        &self,
        logger_name: &str,
        severity: Severity,
        message: impl Into<String>,
        fields: BTreeMap<String, Value>,
        stack_trace: Option<String>,
    ) -> SubmitOutcome {
        let mut event = LogEvent::new(self.id_provider.next_id(), self.clock.now(), severity, logger_name, message);
        event.fields = fields;
        event.exc_info = stack_trace;
        if let Some(context) = self.refresh_identity(context_stack::current()) {
            event = event.with_context(context);
        }

        match &self.queue {
            Some(worker) => match worker.enqueue(event, &self.pipeline) {
                Ok(true) => SubmitOutcome::Queued,
                Ok(false) => SubmitOutcome::QueueFull,
                Err(_) => SubmitOutcome::QueueFull,
            },
            None => SubmitOutcome::Processed(self.pipeline.process(event)),
        }
    }

    /// The processing pipeline's identity-refresh step (spec'd ahead of
    /// stamping): reads the current host/pid/user and, if they differ from
    /// what the bound context already carries, replaces the top of the
    /// context stack with a frame whose `process_id_chain` is extended
    /// accordingly. Returns the (possibly refreshed) frame to attach to
    /// the event being built.
    fn refresh_identity(&self, context: Option<ContextFrame>) -> Option<ContextFrame> {
        let context = context?;
        let hostname = self.platform.hostname();
        let process_id = self.platform.process_id();
        let user_name = self.platform.username();

        if !context.identity_differs(&hostname, process_id, &user_name) {
            return Some(context);
        }

        let refreshed = context.with_refreshed_identity(hostname, process_id, user_name);
        let _ = context_stack::replace_top(refreshed.clone());
        Some(refreshed)
    }
}

static RUNTIME: Lazy<RwLock<Option<Arc<RuntimeHandle>>>> = Lazy::new(|| RwLock::new(None));

/// Builds a runtime from `config` and installs it as the process-wide
/// singleton. Fails with `AlreadyInitialised` if one is already installed;
/// callers must `shutdown()` first.
///
/// `diagnostic_hook` is attached here rather than through `RuntimeConfig`:
/// it is a callback, not a value an environment variable or file can
/// express.
pub fn init(config: RuntimeConfig, diagnostic_hook: Option<Arc<dyn DiagnosticHook>>) -> Result<(), LogRichError> {
    let mut guard = RUNTIME.write();
    if guard.is_some() {
        return Err(LogRichError::AlreadyInitialised);
    }
    let handle = build(config, diagnostic_hook)?;
    *guard = Some(Arc::new(handle));
    Ok(())
}

/// Tears down the installed runtime: stops the queue worker (draining
/// first) and clears the singleton so a later `init` can succeed. If the
/// worker misses its shutdown deadline, the singleton is still cleared —
/// the runtime is left half-torn, per `QueueShutdownTimeout`'s documented
/// recovery contract — and the error is surfaced to the caller.
pub fn shutdown() -> Result<(), LogRichError> {
    let handle = RUNTIME.write().take().ok_or(LogRichError::NotInitialised)?;
    if let Some(worker) = &handle.queue {
        worker.stop(true, handle.queue_stop_timeout, &handle.pipeline)?;
    }
    Ok(())
}

/// The installed runtime, or `NotInitialised` if `init` hasn't run (or a
/// prior `shutdown` already tore it down).
pub fn current() -> Result<Arc<RuntimeHandle>, LogRichError> {
    RUNTIME.read().clone().ok_or(LogRichError::NotInitialised)
}

pub fn is_initialised() -> bool {
    RUNTIME.read().is_some()
}

fn build(config: RuntimeConfig, diagnostic_hook: Option<Arc<dyn DiagnosticHook>>) -> Result<RuntimeHandle, LogRichError> {
    let platform: Arc<dyn Platform> = Arc::from(logrich_bootstrap::create_platform());

    let patterns = config.effective_scrub_patterns();
    let pattern_refs: Vec<&str> = patterns.iter().map(String::as_str).collect();
    let scrubber = Scrubber::new(&pattern_refs, scrubber::DEFAULT_MASK)
        .map_err(|err| LogRichError::invalid_config(format!("invalid scrub pattern: {err}")))?;

    let sinks = build_sinks(&config, platform.as_ref())?;

    let min_severity = [config.console_level, config.backend_level, config.graylog_level]
        .into_iter()
        .min()
        .unwrap_or(Severity::Info);

    let pipeline_config = PipelineConfig {
        min_severity,
        payload_limits: config.payload_limits,
        rate_limit: Some(config.rate_limit_rule()),
        ring_buffer_capacity: if config.enable_ring_buffer { config.ring_buffer_size } else { 1 },
    };

    let pipeline = Arc::new(Pipeline::new(pipeline_config, scrubber, sinks, diagnostic_hook));

    let queue = if config.queue_enabled {
        Some(QueueWorker::spawn(
            pipeline.clone(),
            QueueConfig {
                capacity: config.queue_maxsize,
                policy: config.queue_full_policy,
                enqueue_timeout: config.queue_put_timeout(),
            },
        ))
    } else {
        None
    };

    Ok(RuntimeHandle {
        pipeline,
        queue,
        queue_stop_timeout: config.queue_stop_timeout(),
        clock: Arc::new(SystemClock),
        id_provider: Arc::new(UuidIdProvider),
        platform,
        config,
    })
}

fn build_sinks(config: &RuntimeConfig, platform: &dyn Platform) -> Result<Vec<Arc<dyn Sink>>, LogRichError> {
    let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();

    let console_theme = Theme::new(
        config.console_theme.clone().unwrap_or_else(|| "default".to_string()),
        config.console_styles.clone(),
    );
    let console_template = config
        .console_format_template
        .clone()
        .unwrap_or_else(|| config.console_format_preset.clone());
    let console: Arc<dyn Sink> = Arc::new(ConsoleSink::new(console_template, console_theme, config.console_color()));
    sinks.push(ThresholdSink::new(console, config.console_level));

    if config.enable_journal {
        #[cfg(unix)]
        {
            if platform.supports_journald() {
                let sink: Arc<dyn Sink> = Arc::new(crate::infrastructure::sinks::journald::JournaldSink::connect(
                    config.service.clone(),
                    platform.process_id(),
                )?);
                sinks.push(ThresholdSink::new(sink, config.backend_level));
            } else {
                tracing::warn!(target: "logrich", "enable_journal requested but journald is unreachable on this host; skipping");
            }
        }
        #[cfg(not(unix))]
        {
            tracing::warn!(target: "logrich", "enable_journal requested on a non-Unix platform; skipping");
        }
    }

    if config.enable_eventlog {
        if platform.supports_eventlog() {
            let sink: Arc<dyn Sink> = Arc::new(EventLogSink::register(config.service.clone())?);
            sinks.push(ThresholdSink::new(sink, config.backend_level));
        } else {
            tracing::warn!(target: "logrich", "enable_eventlog requested but the Windows Event Log is unavailable on this host; skipping");
        }
    }

    if config.enable_graylog {
        let host = config
            .graylog_host
            .clone()
            .ok_or_else(|| LogRichError::invalid_config("enable_graylog requires graylog_host"))?;
        let port = config
            .graylog_port
            .ok_or_else(|| LogRichError::invalid_config("enable_graylog requires graylog_port"))?;
        let addr = format!("{host}:{port}");
        let gelf: GelfSink = if config.graylog_tls {
            GelfSink::tls(platform.hostname(), addr, &host)?
        } else {
            match config.graylog_protocol {
                GraylogProtocol::Udp => GelfSink::udp(platform.hostname(), &addr)?,
                GraylogProtocol::Tcp => GelfSink::tcp(platform.hostname(), addr),
            }
        };
        let sink: Arc<dyn Sink> = Arc::new(gelf);
        sinks.push(ThresholdSink::new(sink, config.graylog_level));
    }

    Ok(sinks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_id_provider_produces_unique_ids() {
        let provider = UuidIdProvider;
        let a = provider.next_id();
        let b = provider.next_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn system_clock_reports_a_recent_utc_timestamp() {
        let clock = SystemClock;
        let now = clock.now();
        assert!((Utc::now() - now).num_seconds().abs() < 5);
    }

    #[test]
    fn submit_outcome_reason_matches_each_variant() {
        assert_eq!(SubmitOutcome::QueueFull.reason(), Some("queue_full"));
        assert_eq!(SubmitOutcome::Processed(Outcome::RateLimited).reason(), Some("rate_limited"));
        assert!(SubmitOutcome::Queued.ok());
        assert!(!SubmitOutcome::Processed(Outcome::Rejected).ok());
    }
}

// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The embedder-facing surface: `init`, `bind`, `get`, `dump`, `shutdown`,
//! `is_initialised`, `inspect`. Everything below this module is an
//! implementation detail an application linking `logrich` never needs to
//! name directly.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use logrich_domain::context::ContextFrame;
use logrich_domain::diagnostics::DiagnosticHook;
use logrich_domain::error::LogRichError;
use logrich_domain::levels::Severity;
use logrich_domain::value::Value;

use crate::application::context_stack::{self, ScopeGuard};
use crate::infrastructure::dump::{self, DumpOptions};
pub use crate::runtime::composition_root::SubmitOutcome;
use crate::runtime::composition_root;
pub use crate::runtime::config::RuntimeConfig;

/// Overrides for a `bind` call. Any field left `None` inherits from the
/// current top of the context stack; `service`/`environment`/`job_id` are
/// only mandatory on the very first bind of a fresh stack.
#[derive(Debug, Clone, Default)]
pub struct BindFields {
    pub service: Option<String>,
    pub environment: Option<String>,
    pub job_id: Option<String>,
    pub request_id: Option<String>,
    pub user_id: Option<String>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub extra: BTreeMap<String, Value>,
}

impl BindFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service(mut self, v: impl Into<String>) -> Self {
        self.service = Some(v.into());
        self
    }

    pub fn environment(mut self, v: impl Into<String>) -> Self {
        self.environment = Some(v.into());
        self
    }

    pub fn job_id(mut self, v: impl Into<String>) -> Self {
        self.job_id = Some(v.into());
        self
    }

    pub fn request_id(mut self, v: impl Into<String>) -> Self {
        self.request_id = Some(v.into());
        self
    }

    pub fn user_id(mut self, v: impl Into<String>) -> Self {
        self.user_id = Some(v.into());
        self
    }

    pub fn trace_id(mut self, v: impl Into<String>) -> Self {
        self.trace_id = Some(v.into());
        self
    }

    pub fn span_id(mut self, v: impl Into<String>) -> Self {
        self.span_id = Some(v.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Builds and installs the process-wide runtime from a [`RuntimeConfig`]
/// (see [`RuntimeConfig::from_env`]). `diagnostic_hook` is attached
/// programmatically since it's a callback, not a configuration value.
pub fn init(config: RuntimeConfig, diagnostic_hook: Option<Arc<dyn DiagnosticHook>>) -> Result<(), LogRichError> {
    composition_root::init(config, diagnostic_hook)
}

/// Pushes a context frame for the duration of the returned guard's
/// lifetime. The first bind on an empty stack must supply
/// `service`/`environment`/`job_id`; later binds inherit anything they
/// don't override from the merged view of the stack so far.
pub fn bind(fields: BindFields) -> Result<ScopeGuard, LogRichError> {
    let parent = context_stack::current();

    let service = fields
        .service
        .or_else(|| parent.as_ref().map(|p| p.service.clone()))
        .ok_or_else(|| LogRichError::validation("ContextFrame", "service is required on the first bind"))?;

    if parent.is_none() {
        if fields.environment.is_none() {
            return Err(LogRichError::validation("ContextFrame", "environment is required on the first bind"));
        }
        if fields.job_id.is_none() {
            return Err(LogRichError::validation("ContextFrame", "job_id is required on the first bind"));
        }
    }

    let mut builder = ContextFrame::builder(service);
    if let Some(v) = fields.environment.or_else(|| parent.as_ref().and_then(|p| p.environment.clone())) {
        builder = builder.environment(v);
    }
    if let Some(v) = fields.job_id.or_else(|| parent.as_ref().and_then(|p| p.job_id.clone())) {
        builder = builder.job_id(v);
    }
    if let Some(v) = fields.request_id.or_else(|| parent.as_ref().and_then(|p| p.request_id.clone())) {
        builder = builder.request_id(v);
    }
    if let Some(v) = fields.user_id.or_else(|| parent.as_ref().and_then(|p| p.user_id.clone())) {
        builder = builder.user_id(v);
    }
    if let Some(v) = fields.trace_id.or_else(|| parent.as_ref().and_then(|p| p.trace_id.clone())) {
        builder = builder.trace_id(v);
    }
    if let Some(v) = fields.span_id.or_else(|| parent.as_ref().and_then(|p| p.span_id.clone())) {
        builder = builder.span_id(v);
    }
    for (k, v) in parent.map(|p| p.extra).unwrap_or_default().into_iter().chain(fields.extra) {
        builder = builder.extra(k, v);
    }

    let frame = builder.build()?;
    Ok(context_stack::bind(frame))
}

/// A handle bound to one logger name. Each severity method submits one
/// event and returns its outcome; construction never fails once the
/// runtime is initialised.
pub struct Logger {
    name: String,
    runtime: Arc<composition_root::RuntimeHandle>,
}

impl Logger {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn log(&self, severity: Severity, message: impl Into<String>, fields: BTreeMap<String, Value>) -> SubmitOutcome {
        self.runtime.submit(&self.name, severity, message, fields, None)
    }

    /// Like [`Self::log`] but attaches a rendered stack trace or exception
    /// traceback, truncated by the sanitiser's `stacktrace_max_frames`
    /// limit.
    pub fn log_with_stack_trace(
        &self,
        severity: Severity,
        message: impl Into<String>,
        fields: BTreeMap<String, Value>,
        stack_trace: impl Into<String>,
    ) -> SubmitOutcome {
        self.runtime.submit(&self.name, severity, message, fields, Some(stack_trace.into()))
    }

    pub fn debug(&self, message: impl Into<String>, fields: BTreeMap<String, Value>) -> SubmitOutcome {
        self.log(Severity::Debug, message, fields)
    }

    pub fn info(&self, message: impl Into<String>, fields: BTreeMap<String, Value>) -> SubmitOutcome {
        self.log(Severity::Info, message, fields)
    }

    pub fn warning(&self, message: impl Into<String>, fields: BTreeMap<String, Value>) -> SubmitOutcome {
        self.log(Severity::Warning, message, fields)
    }

    pub fn error(&self, message: impl Into<String>, fields: BTreeMap<String, Value>) -> SubmitOutcome {
        self.log(Severity::Error, message, fields)
    }

    pub fn critical(&self, message: impl Into<String>, fields: BTreeMap<String, Value>) -> SubmitOutcome {
        self.log(Severity::Critical, message, fields)
    }
}

/// Returns a handle for `logger_name`. Fails with `NotInitialised` if
/// called before `init`.
pub fn get(logger_name: impl Into<String>) -> Result<Logger, LogRichError> {
    Ok(Logger {
        name: logger_name.into(),
        runtime: composition_root::current()?,
    })
}

/// Renders the current ring-buffer snapshot with `options`. If `path` is
/// given, writes the rendered text as UTF-8 (creating parent directories
/// as needed) and, on success, flushes the ring buffer's checkpoint
/// (persist, don't clear — see the project's flush-semantics decision).
pub fn dump(options: DumpOptions, path: Option<&Path>) -> Result<String, LogRichError> {
    let runtime = composition_root::current()?;
    let snapshot = runtime.pipeline().ring_buffer().lock().snapshot();
    let rendered = dump::render(&snapshot, &options)?;

    if let Some(path) = path {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, &rendered)?;
        runtime.pipeline().ring_buffer().lock().flush(path)?;
    }

    Ok(rendered)
}

/// Drains the queue, flushes sinks (implicitly, via the drain — sinks own
/// their own resources and are dropped with the pipeline), and clears the
/// runtime singleton.
pub fn shutdown() -> Result<(), LogRichError> {
    composition_root::shutdown()
}

/// Async-friendly wrapper around [`shutdown`] for callers inside a tokio
/// runtime who don't want to block their executor thread on the queue
/// drain.
pub async fn shutdown_async() -> Result<(), LogRichError> {
    tokio::task::spawn_blocking(shutdown).await.unwrap_or_else(|err| {
        Err(LogRichError::invalid_config(format!("shutdown task panicked: {err}")))
    })
}

pub fn is_initialised() -> bool {
    composition_root::is_initialised()
}

/// An immutable snapshot of the installed runtime's thresholds, theme, and
/// queue presence, for introspection without exposing the runtime's
/// internals.
#[derive(Debug, Clone)]
pub struct RuntimeInspection {
    pub service: String,
    pub environment: String,
    pub console_level: Severity,
    pub backend_level: Severity,
    pub graylog_level: Severity,
    pub queue_enabled: bool,
    pub ring_buffer_enabled: bool,
    pub ring_buffer_len: usize,
}

pub fn inspect() -> Result<RuntimeInspection, LogRichError> {
    let runtime = composition_root::current()?;
    let config = runtime.config();
    Ok(RuntimeInspection {
        service: config.service.clone(),
        environment: config.environment.clone(),
        console_level: config.console_level,
        backend_level: config.backend_level,
        graylog_level: config.graylog_level,
        queue_enabled: config.queue_enabled,
        ring_buffer_enabled: config.enable_ring_buffer,
        ring_buffer_len: runtime.pipeline().ring_buffer().lock().len(),
    })
}

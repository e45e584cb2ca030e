// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Sink adapters: the infrastructure-layer implementations of
//! `logrich_domain::sink::Sink`. Each adapter owns exactly one delivery
//! transport; the pipeline's fan-out dispatch isolates failures between
//! them, so an adapter only ever needs to worry about its own transport.

pub mod console;
pub mod eventlog;
pub mod gelf;

#[cfg(unix)]
pub mod journald;

use std::collections::BTreeMap;
use std::sync::Arc;

use logrich_domain::error::LogRichError;
use logrich_domain::event::LogEvent;
use logrich_domain::levels::Severity;
use logrich_domain::sink::Sink;
use logrich_domain::value::Value;

/// Wraps a sink with its own severity threshold, independent of the
/// pipeline's overall minimum severity. The fan-out dispatcher in
/// `application::pipeline` calls every sink unconditionally; per-sink
/// thresholds (`console_level`, `backend_level`, `graylog_level`) are
/// applied here rather than by teaching the dispatcher about them, so
/// adding a differently-thresholded sink never touches pipeline code.
pub struct ThresholdSink {
    inner: Arc<dyn Sink>,
    threshold: Severity,
}

impl ThresholdSink {
    pub fn new(inner: Arc<dyn Sink>, threshold: Severity) -> Arc<dyn Sink> {
        Arc::new(Self { inner, threshold })
    }
}

impl Sink for ThresholdSink {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn write(&self, event: &LogEvent) -> Result<(), LogRichError> {
        if event.severity < self.threshold {
            return Ok(());
        }
        self.inner.write(event)
    }
}

/// Flattens a context frame's scalar fields and an event's own fields into
/// a single `key -> display string` map, used by the journald, Event Log,
/// and GELF adapters to build their structured records. Ordering is
/// deterministic (`BTreeMap`) so record rendering is reproducible.
pub fn flatten_fields(event: &LogEvent) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if let Some(context) = &event.context {
        out.insert("service".to_string(), context.service.clone());
        if let Some(v) = &context.environment {
            out.insert("environment".to_string(), v.clone());
        }
        if let Some(v) = &context.job_id {
            out.insert("job_id".to_string(), v.clone());
        }
        if let Some(v) = &context.request_id {
            out.insert("request_id".to_string(), v.clone());
        }
        if let Some(v) = &context.user_id {
            out.insert("user_id".to_string(), v.clone());
        }
        if let Some(v) = &context.trace_id {
            out.insert("trace_id".to_string(), v.clone());
        }
        if let Some(v) = &context.span_id {
            out.insert("span_id".to_string(), v.clone());
        }
        for (key, value) in &context.extra {
            out.insert(key.clone(), display_value(value));
        }
    }
    for (key, value) in &event.fields {
        out.insert(key.clone(), display_value(value));
    }
    out
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

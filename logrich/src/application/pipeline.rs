// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The processing pipeline: the orchestrator that takes a raw [`LogEvent`]
//! through severity filtering, sanitisation, scrubbing, rate limiting,
//! ring-buffer retention, and fan-out to sinks.
//!
//! This is the synchronous core the queue worker calls from its dedicated
//! consumer thread (or that callers invoke directly when queueing is
//! disabled). It never blocks on I/O itself beyond what an individual
//! `Sink::write` call does.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use logrich_domain::diagnostics::{emit, event_names, DiagnosticHook};
use logrich_domain::error::LogRichError;
use logrich_domain::event::{LogEvent, PayloadLimits};
use logrich_domain::levels::Severity;
use logrich_domain::rate_limiter::{RateLimitRule, RateLimiter};
use logrich_domain::ring_buffer::RingBuffer;
use logrich_domain::sanitiser::{SanitiseOutcome, Sanitiser};
use logrich_domain::scrubber::Scrubber;
use logrich_domain::severity_monitor::{DropReason, SeverityMonitor};
use logrich_domain::sink::Sink;
use logrich_domain::value::Value;
use parking_lot::Mutex;

/// What happened to an event handed to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Emitted,
    RateLimited,
    BelowThreshold,
    Rejected,
}

pub struct PipelineConfig {
    pub min_severity: Severity,
    pub payload_limits: PayloadLimits,
    pub rate_limit: Option<RateLimitRule>,
    pub ring_buffer_capacity: usize,
}

pub struct Pipeline {
    min_severity: Severity,
    sanitiser: Sanitiser,
    scrubber: Scrubber,
    rate_limiter: Option<Mutex<RateLimiter>>,
    ring_buffer: Mutex<RingBuffer>,
    monitor: SeverityMonitor,
    sinks: Vec<Arc<dyn Sink>>,
    diagnostic_hook: Option<Arc<dyn DiagnosticHook>>,
    hook_misbehaved: AtomicBool,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        scrubber: Scrubber,
        sinks: Vec<Arc<dyn Sink>>,
        diagnostic_hook: Option<Arc<dyn DiagnosticHook>>,
    ) -> Self {
        Self {
            min_severity: config.min_severity,
            sanitiser: Sanitiser::new(config.payload_limits),
            scrubber,
            rate_limiter: config.rate_limit.map(|rule| Mutex::new(RateLimiter::new(rule))),
            ring_buffer: Mutex::new(RingBuffer::new(config.ring_buffer_capacity)),
            monitor: SeverityMonitor::new(),
            sinks,
            diagnostic_hook,
            hook_misbehaved: AtomicBool::new(false),
        }
    }

    pub fn monitor(&self) -> &SeverityMonitor {
        &self.monitor
    }

    pub fn ring_buffer(&self) -> &Mutex<RingBuffer> {
        &self.ring_buffer
    }

    /// Runs one event through the full pipeline: threshold filter, sanitise,
    /// scrub, rate-limit, retain, fan out. Never returns `Err` for a
    /// well-formed event; sink failures are isolated per sink and reported
    /// via the diagnostic hook rather than aborting processing.
    pub fn process(&self, mut event: LogEvent) -> Outcome {
        if event.severity < self.min_severity {
            return Outcome::BelowThreshold;
        }

        self.monitor.record_seen(event.severity);

        match self.sanitiser.sanitise(&mut event) {
            SanitiseOutcome::Accepted { truncated: true } => {
                self.report(event_names::PAYLOAD_TRUNCATED, &event);
            }
            SanitiseOutcome::Accepted { truncated: false } => {}
            SanitiseOutcome::Rejected { reason } => {
                self.monitor.record_dropped(DropReason::PayloadRejected);
                tracing::warn!(target: "logrich", logger = %event.logger_name, reason = %reason, "event rejected by sanitiser");
                self.report(event_names::PAYLOAD_REJECTED, &event);
                return Outcome::Rejected;
            }
        }
        if self.scrubber.scrub_event(&mut event) {
            self.report(event_names::FIELD_REDACTED, &event);
        }

        if let Some(limiter) = &self.rate_limiter {
            let key = event.bucket_key();
            let admitted = limiter.lock().allow(key, event.timestamp);
            if !admitted {
                self.monitor.record_dropped(DropReason::RateLimited);
                self.report(event_names::RATE_LIMITED, &event);
                return Outcome::RateLimited;
            }
        }

        self.ring_buffer.lock().push(event.clone());
        self.dispatch(&event);
        self.report(event_names::EMITTED, &event);
        Outcome::Emitted
    }

    /// Fans the event out to every sink, isolating failures: one sink
    /// erroring never prevents the others from receiving the event.
    fn dispatch(&self, event: &LogEvent) {
        for sink in &self.sinks {
            if let Err(err) = sink.write(event) {
                self.monitor.record_dropped(DropReason::SinkError);
                tracing::warn!(target: "logrich", sink = sink.name(), error = %err, "sink delivery failed");
                let mut payload = BTreeMap::new();
                payload.insert("sink".to_string(), Value::String(sink.name().to_string()));
                payload.insert("error".to_string(), Value::String(err.to_string()));
                self.emit_diagnostic(event_names::ADAPTER_ERROR, payload);
            }
        }
    }

    fn report(&self, name: &str, event: &LogEvent) {
        let mut payload = BTreeMap::new();
        payload.insert("logger_name".to_string(), Value::String(event.logger_name.clone()));
        payload.insert("event_id".to_string(), Value::String(event.id.clone()));
        self.emit_diagnostic(name, payload);
    }

    fn emit_diagnostic(&self, name: &str, payload: BTreeMap<String, Value>) {
        let panicked = emit(self.diagnostic_hook.as_ref(), name, payload);
        if panicked && !self.hook_misbehaved.swap(true, Ordering::Relaxed) {
            tracing::warn!(target: "logrich", "diagnostic hook panicked; further panics from it will not be logged again");
        }
    }

    /// Notifies the diagnostic hook that an event was accepted onto the
    /// bounded queue, ahead of the worker actually processing it.
    pub fn report_queued(&self, event: &LogEvent) {
        self.report(event_names::QUEUED, event);
    }

    /// Records that an event was dropped before reaching the pipeline
    /// (queue full under the `Drop` policy, or degraded-mode downgrade of
    /// `Block`), counting it and notifying the diagnostic hook.
    pub fn report_queue_full(&self, event: &LogEvent) {
        self.monitor.record_dropped(DropReason::QueueFull);
        tracing::warn!(target: "logrich", logger = %event.logger_name, "event dropped: queue full");
        self.report(event_names::QUEUE_FULL, event);
    }

    /// Notifies the diagnostic hook that the queue worker's consumer
    /// thread panicked processing an event. `error` is the panic payload
    /// rendered to a string.
    pub fn report_queue_worker_error(&self, error: &str) {
        let mut payload = BTreeMap::new();
        payload.insert("error".to_string(), Value::String(error.to_string()));
        self.emit_diagnostic(event_names::QUEUE_WORKER_ERROR, payload);
    }

    /// Notifies the diagnostic hook that the queue has entered (or is
    /// still in) degraded mode: a `Block` policy is downgraded to `Drop`
    /// until a sustained run of successful processing clears the latch.
    pub fn report_queue_degraded_drop_mode(&self) {
        self.emit_diagnostic(event_names::QUEUE_DEGRADED_DROP_MODE, BTreeMap::new());
    }

    /// Notifies the diagnostic hook that `QueueWorker::stop` exceeded its
    /// deadline waiting for the consumer thread to finish.
    pub fn report_queue_shutdown_timeout(&self, timeout: std::time::Duration) {
        let mut payload = BTreeMap::new();
        payload.insert("timeout_ms".to_string(), Value::Int(timeout.as_millis() as i64));
        self.emit_diagnostic(event_names::QUEUE_SHUTDOWN_TIMEOUT, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;

    struct CountingSink {
        count: AtomicUsize,
        fail: bool,
    }

    impl Sink for CountingSink {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn write(&self, _event: &LogEvent) -> Result<(), LogRichError> {
            self.count.fetch_add(1, Ordering::Relaxed);
            if self.fail {
                Err(LogRichError::sink_unavailable("counting", "forced failure"))
            } else {
                Ok(())
            }
        }
    }

    fn event(severity: Severity) -> LogEvent {
        LogEvent::new("id-1".into(), Utc::now(), severity, "svc", "hello")
    }

    fn pipeline(sinks: Vec<Arc<dyn Sink>>) -> Pipeline {
        Pipeline::new(
            PipelineConfig {
                min_severity: Severity::Info,
                payload_limits: PayloadLimits::default(),
                rate_limit: None,
                ring_buffer_capacity: 10,
            },
            Scrubber::default_patterns().unwrap(),
            sinks,
            None,
        )
    }

    #[test]
    fn below_threshold_events_are_dropped_before_sinks() {
        let sink = Arc::new(CountingSink {
            count: AtomicUsize::new(0),
            fail: false,
        });
        let pipeline = pipeline(vec![sink.clone()]);
        let outcome = pipeline.process(event(Severity::Debug));
        assert_eq!(outcome, Outcome::BelowThreshold);
        assert_eq!(sink.count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn admitted_events_reach_every_sink_and_the_ring_buffer() {
        let sink = Arc::new(CountingSink {
            count: AtomicUsize::new(0),
            fail: false,
        });
        let pipeline = pipeline(vec![sink.clone()]);
        let outcome = pipeline.process(event(Severity::Error));
        assert_eq!(outcome, Outcome::Emitted);
        assert_eq!(sink.count.load(Ordering::Relaxed), 1);
        assert_eq!(pipeline.ring_buffer().lock().len(), 1);
    }

    #[test]
    fn a_failing_sink_does_not_block_other_sinks() {
        let failing = Arc::new(CountingSink {
            count: AtomicUsize::new(0),
            fail: true,
        });
        let healthy = Arc::new(CountingSink {
            count: AtomicUsize::new(0),
            fail: false,
        });
        let pipeline = pipeline(vec![failing.clone(), healthy.clone()]);
        pipeline.process(event(Severity::Error));
        assert_eq!(failing.count.load(Ordering::Relaxed), 1);
        assert_eq!(healthy.count.load(Ordering::Relaxed), 1);
        assert_eq!(pipeline.monitor().dropped_count(DropReason::SinkError), 1);
    }

    #[test]
    fn rate_limited_events_never_reach_sinks() {
        let sink = Arc::new(CountingSink {
            count: AtomicUsize::new(0),
            fail: false,
        });
        let config = PipelineConfig {
            min_severity: Severity::Info,
            payload_limits: PayloadLimits::default(),
            rate_limit: Some(RateLimitRule {
                max_events: 1,
                interval: std::time::Duration::from_secs(60),
            }),
            ring_buffer_capacity: 10,
        };
        let pipeline = Pipeline::new(config, Scrubber::default_patterns().unwrap(), vec![sink.clone()], None);

        assert_eq!(pipeline.process(event(Severity::Warning)), Outcome::Emitted);
        assert_eq!(pipeline.process(event(Severity::Warning)), Outcome::RateLimited);
        assert_eq!(sink.count.load(Ordering::Relaxed), 1);
    }
}

// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Lock-free counters tracking events observed per severity and drops per
//! reason, so the runtime can answer "how many errors have we seen" and
//! "how many events were dropped, and why" without taking a lock on the hot
//! path.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::levels::Severity;

/// Why an event never reached a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    RateLimited,
    QueueFull,
    SinkError,
    PayloadRejected,
}

const SEVERITY_COUNT: usize = 5;
const DROP_REASON_COUNT: usize = 4;

fn severity_index(severity: Severity) -> usize {
    match severity {
        Severity::Debug => 0,
        Severity::Info => 1,
        Severity::Warning => 2,
        Severity::Error => 3,
        Severity::Critical => 4,
    }
}

fn drop_reason_index(reason: DropReason) -> usize {
    match reason {
        DropReason::RateLimited => 0,
        DropReason::QueueFull => 1,
        DropReason::SinkError => 2,
        DropReason::PayloadRejected => 3,
    }
}

pub struct SeverityMonitor {
    seen: [AtomicU64; SEVERITY_COUNT],
    dropped: [AtomicU64; DROP_REASON_COUNT],
}

impl SeverityMonitor {
    pub fn new() -> Self {
        Self {
            seen: std::array::from_fn(|_| AtomicU64::new(0)),
            dropped: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    pub fn record_seen(&self, severity: Severity) {
        self.seen[severity_index(severity)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, reason: DropReason) {
        self.dropped[drop_reason_index(reason)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn seen_count(&self, severity: Severity) -> u64 {
        self.seen[severity_index(severity)].load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self, reason: DropReason) -> u64 {
        self.dropped[drop_reason_index(reason)].load(Ordering::Relaxed)
    }

    pub fn total_seen(&self) -> u64 {
        self.seen.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    pub fn total_dropped(&self) -> u64 {
        self.dropped.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    /// Whether any event at or above `threshold` has been seen. Used by
    /// the composition root to decide whether a process exit code should
    /// reflect logged errors.
    pub fn has_seen_at_least(&self, threshold: Severity) -> bool {
        Severity::ALL
            .iter()
            .filter(|&&s| s >= threshold)
            .any(|&s| self.seen_count(s) > 0)
    }

    pub fn reset(&self) {
        for c in &self.seen {
            c.store(0, Ordering::Relaxed);
        }
        for c in &self.dropped {
            c.store(0, Ordering::Relaxed);
        }
    }
}

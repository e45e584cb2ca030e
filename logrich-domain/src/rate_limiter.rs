// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Sliding-window rate limiting, one bucket per `(logger_name, severity)`.
//!
//! Window boundary is right-inclusive: an event at `ts` counts every prior
//! admitted event in `(ts - interval, ts]`. An event arriving exactly
//! `interval` after the oldest retained event evicts that oldest event
//! before the admission check, so the bucket never holds more than
//! `max_events` that are still within the window.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::levels::Severity;

#[derive(Debug, Default)]
struct Bucket {
    timestamps: VecDeque<DateTime<Utc>>,
}

/// Configuration for a single rate-limit rule: at most `max_events` within
/// `interval`, per bucket key.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitRule {
    pub max_events: usize,
    pub interval: Duration,
}

pub struct RateLimiter {
    rule: RateLimitRule,
    buckets: HashMap<(String, Severity), Bucket>,
}

impl RateLimiter {
    pub fn new(rule: RateLimitRule) -> Self {
        Self {
            rule,
            buckets: HashMap::new(),
        }
    }

    /// Returns `true` if an event with `key` at `timestamp` is admitted,
    /// recording it if so. Returns `false` (and records nothing) if the
    /// bucket is already at capacity within the window.
    pub fn allow(&mut self, key: (String, Severity), timestamp: DateTime<Utc>) -> bool {
        let bucket = self.buckets.entry(key).or_default();
        let cutoff = timestamp - chrono::Duration::from_std(self.rule.interval).unwrap_or(chrono::Duration::zero());
        while let Some(&oldest) = bucket.timestamps.front() {
            if oldest <= cutoff {
                bucket.timestamps.pop_front();
            } else {
                break;
            }
        }

        if bucket.timestamps.len() >= self.rule.max_events {
            return false;
        }
        bucket.timestamps.push_back(timestamp);
        true
    }

    /// Drops all tracked buckets. Used by tests and by `reset`-style
    /// diagnostics.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

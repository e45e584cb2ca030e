// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The log event record and the payload limits applied to it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::ContextFrame;
use crate::levels::Severity;
use crate::value::Value;

/// A single emitted log record: the merged context at the point of
/// emission, plus the event-specific message and fields.
///
/// `id` and `timestamp` are assigned by the `IdProvider`/`Clock` ports at
/// construction time, not derived here, so the domain type stays free of
/// any notion of "how do we get the current time" (infrastructure concern).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub logger_name: String,
    pub message: String,
    pub context: Option<ContextFrame>,
    pub fields: BTreeMap<String, Value>,
    /// A rendered stack trace or exception traceback, attached by the
    /// caller when logging from an error handler. `None` for the common
    /// case of an event with no associated failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exc_info: Option<String>,
}

impl LogEvent {
    pub fn new(
        id: String,
        timestamp: DateTime<Utc>,
        severity: Severity,
        logger_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id,
            timestamp,
            severity,
            logger_name: logger_name.into(),
            message: message.into(),
            context: None,
            fields: BTreeMap::new(),
            exc_info: None,
        }
    }

    pub fn with_context(mut self, context: ContextFrame) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_exc_info(mut self, exc_info: impl Into<String>) -> Self {
        self.exc_info = Some(exc_info.into());
        self
    }

    /// The (logger_name, severity) pair the rate limiter and severity
    /// monitor key on.
    pub fn bucket_key(&self) -> (String, Severity) {
        (self.logger_name.clone(), self.severity)
    }
}

/// Caps applied by the payload sanitiser before an event is allowed further
/// into the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadLimits {
    pub max_message_len: usize,
    /// Whether an overlong message is truncated in place (`true`) or the
    /// whole event is rejected with reason `message_too_long` (`false`).
    pub truncate_message: bool,
    pub max_field_count: usize,
    pub max_field_value_len: usize,
    pub max_extra_depth: usize,
    /// Hard cap on the serialised size of `fields` taken together. Unlike
    /// the other limits, which truncate in place, exceeding this rejects
    /// the whole event: there's no sensible partial extras to keep.
    pub max_extras_total_bytes: usize,
    /// Key-count cap applied to a bound context frame's `extra` map,
    /// mirroring `max_field_count` for event fields.
    pub context_max_keys: usize,
    /// Per-value length cap applied to a bound context frame's `extra`
    /// map, mirroring `max_field_value_len` for event fields.
    pub context_max_value_chars: usize,
    /// How many trailing lines of `exc_info` are kept; older frames (the
    /// top of a traceback) are dropped first.
    pub stacktrace_max_frames: usize,
}

impl Default for PayloadLimits {
    fn default() -> Self {
        Self {
            max_message_len: 8 * 1024,
            truncate_message: true,
            max_field_count: 64,
            max_field_value_len: 4 * 1024,
            max_extra_depth: 6,
            max_extras_total_bytes: 64 * 1024,
            context_max_keys: 64,
            context_max_value_chars: 4 * 1024,
            stacktrace_max_frames: 50,
        }
    }
}

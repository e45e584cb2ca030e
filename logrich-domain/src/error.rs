// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Error taxonomy for the logging runtime.
//!
//! `LogRichError` covers every failure mode from configuration time through
//! steady-state operation. Variants map directly to the error kinds named in
//! the runtime's external contract, with helper constructors and a
//! `category()` for callers that want a stable, human-readable bucket rather
//! than matching on the full enum.

use thiserror::Error;

/// Errors the logging runtime can surface to callers.
#[derive(Debug, Error)]
pub enum LogRichError {
    /// Runtime configuration failed validation (bad env var, bad file, out
    /// of range value). Always fail-fast at init time.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// `init()` called while the process-wide runtime is already bound.
    #[error("runtime already initialised")]
    AlreadyInitialised,

    /// A caller attempted to log, bind context, or dump before `init()`.
    #[error("runtime not initialised")]
    NotInitialised,

    /// A context frame or log event failed a domain invariant (empty
    /// logger name, payload exceeding configured limits, etc).
    #[error("invalid {kind}: {reason}")]
    ValidationFailed { kind: &'static str, reason: String },

    /// The bounded queue was full and the configured policy is "block",
    /// but the deadline for enqueueing elapsed.
    #[error("queue enqueue timed out after {0:?}")]
    QueueEnqueueTimeout(std::time::Duration),

    /// `stop()` exceeded its deadline while draining the queue.
    #[error("queue shutdown timed out after {0:?} with events still pending")]
    QueueShutdownTimeout(std::time::Duration),

    /// A sink adapter failed to construct (socket unreachable, TLS
    /// handshake failed, platform unsupported).
    #[error("sink {sink} unavailable: {reason}")]
    SinkUnavailable { sink: &'static str, reason: String },

    /// The requested feature is not supported on the current platform
    /// (e.g. `enable_eventlog` on a non-Windows host).
    #[error("{0} is not supported on this platform")]
    PlatformUnsupported(&'static str),

    /// Ring buffer checkpoint I/O failed.
    #[error("ring buffer checkpoint error: {0}")]
    CheckpointIo(#[from] std::io::Error),

    /// Ring buffer checkpoint content could not be parsed.
    #[error("ring buffer checkpoint is malformed: {0}")]
    CheckpointDecode(#[from] serde_json::Error),

    /// Dump rendering was requested with an unsupported format/theme
    /// combination or encountered an internal template error.
    #[error("dump rendering failed: {0}")]
    DumpFailed(String),
}

impl LogRichError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }

    pub fn validation(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::ValidationFailed {
            kind,
            reason: reason.into(),
        }
    }

    pub fn sink_unavailable(sink: &'static str, reason: impl Into<String>) -> Self {
        Self::SinkUnavailable {
            sink,
            reason: reason.into(),
        }
    }

    /// A stable, lowercase category slug for metrics/logging, independent
    /// of the error's formatted message.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration(_) => "configuration",
            Self::AlreadyInitialised | Self::NotInitialised => "lifecycle",
            Self::ValidationFailed { .. } => "validation",
            Self::QueueEnqueueTimeout(_) => "backpressure",
            Self::QueueShutdownTimeout(_) => "shutdown",
            Self::SinkUnavailable { .. } => "sink",
            Self::PlatformUnsupported(_) => "platform",
            Self::CheckpointIo(_) | Self::CheckpointDecode(_) => "checkpoint",
            Self::DumpFailed(_) => "dump",
        }
    }

    /// Whether a caller can reasonably retry or continue after this error.
    /// Everything else is fail-fast (configuration/lifecycle mistakes).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::QueueEnqueueTimeout(_) | Self::QueueShutdownTimeout(_) | Self::SinkUnavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_is_stable_per_variant() {
        assert_eq!(LogRichError::invalid_config("bad").category(), "configuration");
        assert_eq!(LogRichError::AlreadyInitialised.category(), "lifecycle");
        assert_eq!(
            LogRichError::sink_unavailable("gelf", "connect refused").category(),
            "sink"
        );
    }

    #[test]
    fn recoverable_classification() {
        assert!(LogRichError::QueueEnqueueTimeout(std::time::Duration::from_secs(1)).is_recoverable());
        assert!(!LogRichError::NotInitialised.is_recoverable());
        assert!(!LogRichError::invalid_config("x").is_recoverable());
    }
}

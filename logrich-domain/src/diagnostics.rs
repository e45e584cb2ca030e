// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The diagnostic hook: a callback embedding applications can register to
//! observe internal runtime events (truncation, redaction, rate-limit
//! denials, queue drops, sink failures) without those events going through
//! the log pipeline itself.
//!
//! A hook that panics or the embedder's closure that errors must never
//! affect pipeline behaviour: `emit` catches unwinding panics at the call
//! site and logs (via the bootstrap logger, in the infrastructure layer)
//! that the hook misbehaved, then proceeds as if nothing happened.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::value::Value;

pub type DiagnosticPayload = BTreeMap<String, Value>;

pub trait DiagnosticHook: Send + Sync {
    fn on_event(&self, name: &str, payload: &DiagnosticPayload);
}

impl<F> DiagnosticHook for F
where
    F: Fn(&str, &DiagnosticPayload) + Send + Sync,
{
    fn on_event(&self, name: &str, payload: &DiagnosticPayload) {
        self(name, payload)
    }
}

/// Invokes `hook` if present, swallowing any panic it raises. Returns
/// whether the hook panicked, so the caller can report it once via its own
/// logging rather than crashing the pipeline.
pub fn emit(hook: Option<&Arc<dyn DiagnosticHook>>, name: &str, payload: DiagnosticPayload) -> bool {
    let Some(hook) = hook else {
        return false;
    };
    let result = catch_unwind(AssertUnwindSafe(|| hook.on_event(name, &payload)));
    result.is_err()
}

/// The stable diagnostic event vocabulary. Values are the literal names
/// delivered to a registered `DiagnosticHook`; treat them as part of the
/// public contract, not internal labels.
pub mod event_names {
    pub const QUEUED: &str = "queued";
    pub const EMITTED: &str = "emitted";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const PAYLOAD_TRUNCATED: &str = "payload_truncated";
    pub const PAYLOAD_REJECTED: &str = "payload_rejected";
    pub const QUEUE_FULL: &str = "queue_full";
    pub const QUEUE_DROP_CALLBACK_ERROR: &str = "queue_drop_callback_error";
    pub const QUEUE_WORKER_ERROR: &str = "queue_worker_error";
    pub const QUEUE_DEGRADED_DROP_MODE: &str = "queue_degraded_drop_mode";
    pub const QUEUE_SHUTDOWN_TIMEOUT: &str = "queue_shutdown_timeout";
    pub const ADAPTER_ERROR: &str = "adapter_error";

    /// Supplemental: not in the stable vocabulary above, emitted alongside
    /// `payload_truncated` when the scrubber redacts a field.
    pub const FIELD_REDACTED: &str = "field_redacted";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_panicking_hook_is_swallowed() {
        let hook: Arc<dyn DiagnosticHook> = Arc::new(|_: &str, _: &DiagnosticPayload| {
            panic!("misbehaving hook");
        });
        let panicked = emit(Some(&hook), event_names::QUEUE_FULL, BTreeMap::new());
        assert!(panicked);
    }

    #[test]
    fn a_well_behaved_hook_receives_the_payload() {
        let seen = std::sync::Mutex::new(None);
        let hook: Arc<dyn DiagnosticHook> = Arc::new(move |name: &str, payload: &DiagnosticPayload| {
            *seen.lock().unwrap() = Some((name.to_string(), payload.clone()));
        });
        let mut payload = BTreeMap::new();
        payload.insert("sink".to_string(), Value::String("gelf".to_string()));
        let panicked = emit(Some(&hook), event_names::ADAPTER_ERROR, payload);
        assert!(!panicked);
    }

    #[test]
    fn no_hook_is_a_no_op() {
        assert!(!emit(None, event_names::QUEUE_FULL, BTreeMap::new()));
    }
}

// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Context frames and the stack that holds them.
//!
//! A `ContextFrame` is an immutable snapshot of "what is true about the
//! current unit of work" (service, environment, correlation ids, arbitrary
//! extras). Frames are pushed onto a per-thread `ContextStack` as work scopes
//! nest (a request handler binds one frame, a sub-task binds another on top
//! of it); every log event picks up the merged view of the stack at the
//! point it is emitted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LogRichError;
use crate::value::Value;

/// The longest fork lineage a `process_id_chain` retains. Older ancestors
/// fall off the front once a chain grows past this, keeping the field
/// bounded regardless of how deep a process tree gets.
pub const MAX_PROCESS_ID_CHAIN_LEN: usize = 8;

/// An immutable snapshot of contextual fields bound for the current scope.
///
/// Construct via [`ContextFrame::builder`]; all fields are validated at
/// build time so a `ContextFrame` in hand is always well-formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextFrame {
    pub service: String,
    pub environment: Option<String>,
    pub job_id: Option<String>,
    pub request_id: Option<String>,
    pub user_id: Option<String>,
    /// System-derived fields below are not meant to be set by application
    /// code directly; they are populated by the processing pipeline's
    /// identity-refresh step (see [`ContextFrame::with_refreshed_identity`])
    /// and carried here so every emitted event can show where it came from.
    pub user_name: Option<String>,
    pub hostname: Option<String>,
    pub process_id: Option<u32>,
    /// The fork lineage of process ids this frame has been carried
    /// through, oldest first, bounded to [`MAX_PROCESS_ID_CHAIN_LEN`]
    /// entries.
    pub process_id_chain: Vec<u32>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub extra: BTreeMap<String, Value>,
}

impl ContextFrame {
    pub fn builder(service: impl Into<String>) -> ContextFrameBuilder {
        ContextFrameBuilder {
            service: service.into(),
            environment: None,
            job_id: None,
            request_id: None,
            user_id: None,
            user_name: None,
            hostname: None,
            process_id: None,
            process_id_chain: Vec::new(),
            trace_id: None,
            span_id: None,
            extra: BTreeMap::new(),
        }
    }

    /// Produces a new frame with `other`'s non-default fields layered over
    /// this one: `other` wins on any field it sets, extras are merged key by
    /// key with `other` winning on conflicts. Used to flatten a
    /// [`ContextStack`] into the single frame a `LogEvent` carries.
    pub fn layer(&self, other: &ContextFrame) -> ContextFrame {
        let mut extra = self.extra.clone();
        extra.extend(other.extra.clone());
        ContextFrame {
            service: other.service.clone(),
            environment: other.environment.clone().or_else(|| self.environment.clone()),
            job_id: other.job_id.clone().or_else(|| self.job_id.clone()),
            request_id: other.request_id.clone().or_else(|| self.request_id.clone()),
            user_id: other.user_id.clone().or_else(|| self.user_id.clone()),
            user_name: other.user_name.clone().or_else(|| self.user_name.clone()),
            hostname: other.hostname.clone().or_else(|| self.hostname.clone()),
            process_id: other.process_id.or(self.process_id),
            process_id_chain: if other.process_id_chain.is_empty() {
                self.process_id_chain.clone()
            } else {
                other.process_id_chain.clone()
            },
            trace_id: other.trace_id.clone().or_else(|| self.trace_id.clone()),
            span_id: other.span_id.clone().or_else(|| self.span_id.clone()),
            extra,
        }
    }

    /// Whether the observed host/pid/user differ from what this frame
    /// already carries, meaning the pipeline's identity-refresh step needs
    /// to produce an updated frame via [`Self::with_refreshed_identity`].
    pub fn identity_differs(&self, hostname: &str, process_id: u32, user_name: &str) -> bool {
        self.hostname.as_deref() != Some(hostname) || self.process_id != Some(process_id) || self.user_name.as_deref() != Some(user_name)
    }

    /// Returns a clone with the system-derived identity fields refreshed.
    /// `process_id_chain` is extended with `process_id` unless it is
    /// already the chain's tail, then truncated to
    /// [`MAX_PROCESS_ID_CHAIN_LEN`] entries (oldest ancestors drop off
    /// first).
    pub fn with_refreshed_identity(&self, hostname: impl Into<String>, process_id: u32, user_name: impl Into<String>) -> ContextFrame {
        let mut chain = self.process_id_chain.clone();
        if chain.last() != Some(&process_id) {
            chain.push(process_id);
            if chain.len() > MAX_PROCESS_ID_CHAIN_LEN {
                let excess = chain.len() - MAX_PROCESS_ID_CHAIN_LEN;
                chain.drain(0..excess);
            }
        }
        ContextFrame {
            hostname: Some(hostname.into()),
            process_id: Some(process_id),
            user_name: Some(user_name.into()),
            process_id_chain: chain,
            ..self.clone()
        }
    }
}

pub struct ContextFrameBuilder {
    service: String,
    environment: Option<String>,
    job_id: Option<String>,
    request_id: Option<String>,
    user_id: Option<String>,
    user_name: Option<String>,
    hostname: Option<String>,
    process_id: Option<u32>,
    process_id_chain: Vec<u32>,
    trace_id: Option<String>,
    span_id: Option<String>,
    extra: BTreeMap<String, Value>,
}

impl ContextFrameBuilder {
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

    pub fn user_name(mut self, v: impl Into<String>) -> Self {
        self.user_name = Some(v.into());
        self
    }

    pub fn hostname(mut self, v: impl Into<String>) -> Self {
        self.hostname = Some(v.into());
        self
    }

    pub fn process_id(mut self, v: u32) -> Self {
        self.process_id = Some(v);
        self
    }

    /// Sets the chain explicitly (used when reconstructing a frame from a
    /// [`ContextStack::deserialise`] payload). Truncated to
    /// [`MAX_PROCESS_ID_CHAIN_LEN`] if longer.
    pub fn process_id_chain(mut self, mut v: Vec<u32>) -> Self {
        if v.len() > MAX_PROCESS_ID_CHAIN_LEN {
            let excess = v.len() - MAX_PROCESS_ID_CHAIN_LEN;
            v.drain(0..excess);
        }
        self.process_id_chain = v;
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

    pub fn build(self) -> Result<ContextFrame, LogRichError> {
        if self.service.trim().is_empty() {
            return Err(LogRichError::validation("ContextFrame", "service must not be empty"));
        }
        // Seed the chain to the lone pid once one is known, mirroring the
        // first-bind seeding rule: a frame with a pid but no recorded
        // lineage is its own root.
        let process_id_chain = if self.process_id_chain.is_empty() {
            self.process_id.map(|pid| vec![pid]).unwrap_or_default()
        } else {
            self.process_id_chain
        };
        Ok(ContextFrame {
            service: self.service,
            environment: self.environment,
            job_id: self.job_id,
            request_id: self.request_id,
            user_id: self.user_id,
            user_name: self.user_name,
            hostname: self.hostname,
            process_id: self.process_id,
            process_id_chain,
            trace_id: self.trace_id,
            span_id: self.span_id,
            extra: self.extra,
        })
    }
}

/// An ordered collection of frames as they are pushed for nested scopes.
///
/// `ContextStack` itself holds no thread/task affinity; the runtime crate
/// owns the thread-local/task-local storage and pushes/pops frames onto an
/// instance of this type. It is a plain value type so it can be unit tested
/// and snapshotted independent of any concurrency primitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextStack {
    frames: Vec<ContextFrame>,
}

/// The envelope version [`ContextStack::serialise`] stamps onto every
/// snapshot. Bumped if the wire shape of a frame ever changes
/// incompatibly, so a receiver can refuse a payload it can't interpret
/// instead of silently misreading it.
pub const CONTEXT_STACK_VERSION: u32 = 1;

/// A versioned, transport-friendly snapshot of an entire [`ContextStack`],
/// suitable for handing to another process (a worker pool, a subprocess)
/// that should pick up logging with the same bound context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextStackSnapshot {
    pub version: u32,
    pub stack: Vec<ContextFrame>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn push(&mut self, frame: ContextFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<ContextFrame> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Overwrites the top frame in place. Used by the processing
    /// pipeline's identity-refresh step, which needs to update the bound
    /// context's host/pid/user without pushing a whole new scope. Fails
    /// with a validation error if the stack is empty.
    pub fn replace_top(&mut self, frame: ContextFrame) -> Result<(), LogRichError> {
        match self.frames.last_mut() {
            Some(top) => {
                *top = frame;
                Ok(())
            }
            None => Err(LogRichError::validation("ContextStack", "cannot replace_top of an empty stack")),
        }
    }

    /// Clears every bound frame, as if the stack had just been created.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Flattens the stack into a single frame, bottom frame first, each
    /// subsequent frame layered on top. Returns `None` for an empty stack.
    pub fn merged(&self) -> Option<ContextFrame> {
        let mut iter = self.frames.iter();
        let first = iter.next()?.clone();
        Some(iter.fold(first, |acc, frame| acc.layer(frame)))
    }

    /// Snapshots the stack with a version tag, suitable for
    /// [`Self::deserialise`] on the receiving end.
    pub fn serialise(&self) -> ContextStackSnapshot {
        ContextStackSnapshot {
            version: CONTEXT_STACK_VERSION,
            stack: self.frames.clone(),
        }
    }

    /// Rebuilds a stack from a [`ContextStackSnapshot`]. Fails if the
    /// snapshot's version doesn't match [`CONTEXT_STACK_VERSION`].
    pub fn deserialise(snapshot: ContextStackSnapshot) -> Result<ContextStack, LogRichError> {
        if snapshot.version != CONTEXT_STACK_VERSION {
            return Err(LogRichError::validation(
                "ContextStack",
                format!("unsupported context stack version: {}", snapshot.version),
            ));
        }
        Ok(ContextStack { frames: snapshot.stack })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_empty_service() {
        let err = ContextFrame::builder("  ").build().unwrap_err();
        assert_eq!(err.category(), "validation");
    }

    #[test]
    fn layering_prefers_the_later_frame_but_falls_back() {
        let base = ContextFrame::builder("svc").environment("prod").build().unwrap();
        let child = ContextFrame::builder("svc").request_id("r-1").build().unwrap();
        let merged = base.layer(&child);
        assert_eq!(merged.environment.as_deref(), Some("prod"));
        assert_eq!(merged.request_id.as_deref(), Some("r-1"));
    }

    #[test]
    fn stack_merges_bottom_to_top() {
        let mut stack = ContextStack::new();
        stack.push(ContextFrame::builder("svc").extra("a", 1i64).build().unwrap());
        stack.push(ContextFrame::builder("svc").extra("a", 2i64).extra("b", 3i64).build().unwrap());
        let merged = stack.merged().unwrap();
        assert_eq!(merged.extra.get("a"), Some(&Value::Int(2)));
        assert_eq!(merged.extra.get("b"), Some(&Value::Int(3)));
    }

    #[test]
    fn empty_stack_has_no_merged_frame() {
        assert!(ContextStack::new().merged().is_none());
    }

    #[test]
    fn first_process_id_seeds_the_chain() {
        let frame = ContextFrame::builder("svc").process_id(42).build().unwrap();
        assert_eq!(frame.process_id_chain, vec![42]);
    }

    #[test]
    fn refreshed_identity_extends_the_chain_with_a_new_pid() {
        let frame = ContextFrame::builder("svc").process_id(1).build().unwrap();
        let refreshed = frame.with_refreshed_identity("host-a", 2, "alice");
        assert_eq!(refreshed.process_id_chain, vec![1, 2]);
        assert_eq!(refreshed.hostname.as_deref(), Some("host-a"));
        assert_eq!(refreshed.user_name.as_deref(), Some("alice"));
    }

    #[test]
    fn refreshed_identity_does_not_duplicate_the_current_tail() {
        let frame = ContextFrame::builder("svc").process_id(7).build().unwrap();
        let refreshed = frame.with_refreshed_identity("host-a", 7, "alice");
        assert_eq!(refreshed.process_id_chain, vec![7]);
    }

    #[test]
    fn process_id_chain_is_bounded_to_max_length() {
        let mut frame = ContextFrame::builder("svc").process_id(0).build().unwrap();
        for pid in 1..=(MAX_PROCESS_ID_CHAIN_LEN as u32 + 5) {
            frame = frame.with_refreshed_identity("host-a", pid, "alice");
        }
        assert_eq!(frame.process_id_chain.len(), MAX_PROCESS_ID_CHAIN_LEN);
        assert_eq!(*frame.process_id_chain.last().unwrap(), MAX_PROCESS_ID_CHAIN_LEN as u32 + 5);
    }

    #[test]
    fn identity_differs_detects_a_changed_pid() {
        let frame = ContextFrame::builder("svc").process_id(1).hostname("host-a").user_name("alice").build().unwrap();
        assert!(!frame.identity_differs("host-a", 1, "alice"));
        assert!(frame.identity_differs("host-a", 2, "alice"));
    }

    #[test]
    fn replace_top_overwrites_the_last_frame() {
        let mut stack = ContextStack::new();
        stack.push(ContextFrame::builder("svc").job_id("j-1").build().unwrap());
        stack.replace_top(ContextFrame::builder("svc").job_id("j-2").build().unwrap()).unwrap();
        assert_eq!(stack.merged().unwrap().job_id.as_deref(), Some("j-2"));
    }

    #[test]
    fn replace_top_on_an_empty_stack_fails() {
        let mut stack = ContextStack::new();
        let err = stack.replace_top(ContextFrame::builder("svc").build().unwrap()).unwrap_err();
        assert_eq!(err.category(), "validation");
    }

    #[test]
    fn clear_empties_the_stack() {
        let mut stack = ContextStack::new();
        stack.push(ContextFrame::builder("svc").build().unwrap());
        stack.clear();
        assert!(stack.is_empty());
    }

    #[test]
    fn deserialise_of_serialise_round_trips() {
        let mut stack = ContextStack::new();
        stack.push(ContextFrame::builder("svc").environment("prod").build().unwrap());
        stack.push(ContextFrame::builder("svc").request_id("r-1").build().unwrap());
        let snapshot = stack.serialise();
        assert_eq!(snapshot.version, CONTEXT_STACK_VERSION);
        let restored = ContextStack::deserialise(snapshot).unwrap();
        assert_eq!(restored, stack);
    }

    #[test]
    fn deserialise_rejects_an_unknown_version() {
        let snapshot = ContextStackSnapshot { version: 999, stack: Vec::new() };
        let err = ContextStack::deserialise(snapshot).unwrap_err();
        assert_eq!(err.category(), "validation");
    }
}

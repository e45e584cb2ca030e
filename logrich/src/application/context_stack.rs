// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Thread-local, async-aware context binding.
//!
//! Synchronous call stacks get a plain `thread_local!` `ContextStack`.
//! Spans crossing an `.await` point get an additional `tokio::task_local!`
//! layer so a context bound in one task doesn't leak into an unrelated task
//! scheduled on the same worker thread afterwards. [`bind`] pushes onto
//! whichever layer is active and returns an RAII guard that pops on drop,
//! so scopes can never be unbalanced by an early return or a panic
//! unwinding through them.

use std::cell::RefCell;

use logrich_domain::context::{ContextFrame, ContextStack, ContextStackSnapshot};
use logrich_domain::error::LogRichError;

thread_local! {
    static THREAD_STACK: RefCell<ContextStack> = RefCell::new(ContextStack::new());
}

tokio::task_local! {
    static TASK_STACK: RefCell<ContextStack>;
}

/// Binds `frame` for the duration of the returned guard's lifetime. Nested
/// calls stack: the most recently bound frame takes precedence for any
/// field it sets, per [`ContextStack::merged`].
#[must_use = "the binding is popped when this guard drops; assign it to a variable"]
pub fn bind(frame: ContextFrame) -> ScopeGuard {
    if TASK_STACK.try_with(|stack| stack.borrow_mut().push(frame.clone())).is_ok() {
        return ScopeGuard { in_task: true };
    }
    THREAD_STACK.with(|stack| stack.borrow_mut().push(frame));
    ScopeGuard { in_task: false }
}

/// Runs `fut` with a fresh task-local context layer, isolating whatever is
/// bound inside it from the surrounding task. Used at task-spawn
/// boundaries so a spawned task doesn't inherit its spawner's bindings by
/// accident through thread-local reuse.
pub async fn scoped<F: std::future::Future>(fut: F) -> F::Output {
    TASK_STACK.scope(RefCell::new(ContextStack::new()), fut).await
}

/// The merged view of whichever context layer (task-local, falling back to
/// thread-local) is active right now.
pub fn current() -> Option<ContextFrame> {
    let from_task = TASK_STACK
        .try_with(|stack| stack.borrow().merged())
        .ok()
        .flatten();
    if from_task.is_some() {
        return from_task;
    }
    THREAD_STACK.with(|stack| stack.borrow().merged())
}

/// Whether the calling code is inside a [`scoped`] task-local layer right
/// now, as opposed to falling back to the thread-local one.
fn in_task_scope() -> bool {
    TASK_STACK.try_with(|_| ()).is_ok()
}

/// Overwrites the top frame of whichever layer is active. Used by the
/// pipeline's identity-refresh step; fails if no frame is bound yet.
pub fn replace_top(frame: ContextFrame) -> Result<(), LogRichError> {
    if in_task_scope() {
        TASK_STACK.with(|stack| stack.borrow_mut().replace_top(frame))
    } else {
        THREAD_STACK.with(|stack| stack.borrow_mut().replace_top(frame))
    }
}

/// Snapshots whichever layer is active right now, for handing off to
/// another process via [`deserialise`].
pub fn serialise() -> ContextStackSnapshot {
    if in_task_scope() {
        TASK_STACK.with(|stack| stack.borrow().serialise())
    } else {
        THREAD_STACK.with(|stack| stack.borrow().serialise())
    }
}

/// Replaces whichever layer is active right now with the stack encoded in
/// `snapshot`. Fails if the snapshot's version tag is unrecognised.
pub fn deserialise(snapshot: ContextStackSnapshot) -> Result<(), LogRichError> {
    let restored = ContextStack::deserialise(snapshot)?;
    if in_task_scope() {
        TASK_STACK.with(|stack| *stack.borrow_mut() = restored);
    } else {
        THREAD_STACK.with(|stack| *stack.borrow_mut() = restored);
    }
    Ok(())
}

/// Clears every frame from whichever layer is active right now.
pub fn clear() {
    if in_task_scope() {
        TASK_STACK.with(|stack| stack.borrow_mut().clear());
    } else {
        THREAD_STACK.with(|stack| stack.borrow_mut().clear());
    }
}

pub struct ScopeGuard {
    in_task: bool,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if self.in_task {
            let _ = TASK_STACK.try_with(|stack| {
                stack.borrow_mut().pop();
            });
        } else {
            THREAD_STACK.with(|stack| {
                stack.borrow_mut().pop();
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_local_binding_is_visible_while_guard_lives() {
        assert!(current().is_none());
        let frame = ContextFrame::builder("svc").request_id("r-1").build().unwrap();
        {
            let _guard = bind(frame);
            assert_eq!(current().unwrap().request_id.as_deref(), Some("r-1"));
        }
        assert!(current().is_none());
    }

    #[test]
    fn nested_bindings_layer_with_inner_winning() {
        let outer = ContextFrame::builder("svc").environment("prod").build().unwrap();
        let inner = ContextFrame::builder("svc").request_id("r-2").build().unwrap();
        let _g1 = bind(outer);
        let _g2 = bind(inner);
        let merged = current().unwrap();
        assert_eq!(merged.environment.as_deref(), Some("prod"));
        assert_eq!(merged.request_id.as_deref(), Some("r-2"));
    }

    #[tokio::test]
    async fn task_scope_isolates_bindings() {
        scoped(async {
            let frame = ContextFrame::builder("svc").job_id("j-1").build().unwrap();
            let _guard = bind(frame);
            assert_eq!(current().unwrap().job_id.as_deref(), Some("j-1"));
        })
        .await;
    }

    #[test]
    fn replace_top_overwrites_the_bound_frame() {
        let outer = ContextFrame::builder("svc").job_id("j-1").build().unwrap();
        let _guard = bind(outer);
        replace_top(ContextFrame::builder("svc").job_id("j-2").build().unwrap()).unwrap();
        assert_eq!(current().unwrap().job_id.as_deref(), Some("j-2"));
    }

    #[test]
    fn replace_top_without_a_bound_frame_fails() {
        assert!(current().is_none());
        assert!(replace_top(ContextFrame::builder("svc").build().unwrap()).is_err());
    }

    #[test]
    fn deserialise_of_serialise_round_trips_the_bound_stack() {
        let outer = ContextFrame::builder("svc").environment("prod").build().unwrap();
        let _guard = bind(outer);
        let snapshot = serialise();

        clear();
        assert!(current().is_none());

        deserialise(snapshot.clone()).unwrap();
        assert_eq!(serialise(), snapshot);
        assert_eq!(current().unwrap().environment.as_deref(), Some("prod"));

        clear();
    }
}

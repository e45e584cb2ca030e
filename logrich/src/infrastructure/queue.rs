// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The bounded queue worker: decouples event producers from the pipeline
//! by handing events to a dedicated consumer thread over a bounded
//! `crossbeam-channel`.
//!
//! ## Policy
//!
//! - **Block**: `enqueue` waits (up to a configured deadline) for room in
//!   the channel. A deadline overrun surfaces as
//!   [`LogRichError::QueueEnqueueTimeout`].
//! - **Drop**: `enqueue` never waits; if the channel is full the event is
//!   dropped immediately and counted via the severity monitor.
//!
//! ## Degraded mode
//!
//! If the consumer thread panics while processing an event, `catch_unwind`
//! keeps that same thread alive for the next message and a `worker_failed`
//! latch is set: while it is set, a `Block` policy is downgraded to `Drop`
//! (producers must never stall waiting on a worker that has already
//! demonstrated it can fail). The latch clears after a sustained interval
//! of successful processing, restoring the configured policy.
//!
//! ## Shutdown
//!
//! `stop(drain, timeout, pipeline)` asks the worker to finish (draining
//! already queued events first if `drain` is true, discarding them
//! otherwise) and joins its thread within `timeout`, raising
//! [`LogRichError::QueueShutdownTimeout`] (and reporting
//! `queue_shutdown_timeout` via the diagnostic hook) if the deadline is
//! exceeded.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use logrich_domain::error::LogRichError;
use logrich_domain::event::LogEvent;
use serde::{Deserialize, Serialize};

use crate::application::pipeline::Pipeline;

const RECOVERY_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueuePolicy {
    Block,
    Drop,
}

#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    pub capacity: usize,
    pub policy: QueuePolicy,
    pub enqueue_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            policy: QueuePolicy::Block,
            enqueue_timeout: Duration::from_millis(500),
        }
    }
}

enum Message {
    Event(LogEvent),
    Shutdown { drain: bool },
}

#[derive(Default)]
struct Finished {
    lock: Mutex<bool>,
    cvar: Condvar,
}

impl Finished {
    fn signal(&self) {
        *self.lock.lock().unwrap() = true;
        self.cvar.notify_all();
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.lock.lock().unwrap();
        if *guard {
            return true;
        }
        let (guard, _) = self.cvar.wait_timeout(guard, timeout).unwrap();
        *guard
    }
}

pub struct QueueWorker {
    sender: Sender<Message>,
    handle: Mutex<Option<JoinHandle<()>>>,
    finished: Arc<Finished>,
    policy: QueuePolicy,
    enqueue_timeout: Duration,
    worker_failed: Arc<AtomicBool>,
}

impl QueueWorker {
    pub fn spawn(pipeline: Arc<Pipeline>, config: QueueConfig) -> Self {
        let (sender, receiver) = channel::bounded(config.capacity.max(1));
        let worker_failed = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(Finished::default());

        let handle = {
            let worker_failed = worker_failed.clone();
            let finished = finished.clone();
            std::thread::Builder::new()
                .name("logrich-queue-worker".into())
                .spawn(move || run_consumer(receiver, pipeline, worker_failed, finished))
                .expect("failed to spawn logrich queue worker thread")
        };

        Self {
            sender,
            handle: Mutex::new(Some(handle)),
            finished,
            policy: config.policy,
            enqueue_timeout: config.enqueue_timeout,
            worker_failed,
        }
    }

    fn effective_policy(&self) -> QueuePolicy {
        if self.worker_failed.load(Ordering::Relaxed) {
            QueuePolicy::Drop
        } else {
            self.policy
        }
    }

    /// Enqueues an event. Returns `Ok(true)` if it was handed to the
    /// worker, `Ok(false)` if it was dropped under the `Drop` policy (or
    /// the degraded downgrade of `Block`), and `Err` only when the `Block`
    /// policy's deadline elapses.
    pub fn enqueue(&self, event: LogEvent, pipeline: &Pipeline) -> Result<bool, LogRichError> {
        match self.effective_policy() {
            QueuePolicy::Drop => {
                pipeline.report_queued(&event);
                match self.sender.try_send(Message::Event(event)) {
                    Ok(()) => Ok(true),
                    Err(TrySendError::Full(Message::Event(dropped))) | Err(TrySendError::Disconnected(Message::Event(dropped))) => {
                        pipeline.report_queue_full(&dropped);
                        Ok(false)
                    }
                    Err(_) => Ok(false),
                }
            }
            QueuePolicy::Block => {
                pipeline.report_queued(&event);
                match self.sender.send_timeout(Message::Event(event), self.enqueue_timeout) {
                    Ok(()) => Ok(true),
                    Err(_) => Err(LogRichError::QueueEnqueueTimeout(self.enqueue_timeout)),
                }
            }
        }
    }

    /// Requests the worker stop, optionally draining already-queued
    /// events first, and waits up to `timeout` for it to finish.
    pub fn stop(&self, drain: bool, timeout: Duration, pipeline: &Pipeline) -> Result<(), LogRichError> {
        let _ = self.sender.send(Message::Shutdown { drain });
        if self.finished.wait_timeout(timeout) {
            if let Some(handle) = self.handle.lock().unwrap().take() {
                let _ = handle.join();
            }
            Ok(())
        } else {
            pipeline.report_queue_shutdown_timeout(timeout);
            Err(LogRichError::QueueShutdownTimeout(timeout))
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn run_consumer(receiver: Receiver<Message>, pipeline: Arc<Pipeline>, worker_failed: Arc<AtomicBool>, finished: Arc<Finished>) {
    let mut last_failure: Option<Instant> = None;

    for message in receiver.iter() {
        match message {
            Message::Event(event) => {
                let result = catch_unwind(AssertUnwindSafe(|| pipeline.process(event)));
                match result {
                    Ok(_) => {
                        if worker_failed.load(Ordering::Relaxed) {
                            if let Some(failed_at) = last_failure {
                                if failed_at.elapsed() >= RECOVERY_INTERVAL {
                                    worker_failed.store(false, Ordering::Relaxed);
                                    tracing::info!(target: "logrich", "queue worker recovered, exiting degraded mode");
                                }
                            }
                        }
                    }
                    Err(panic) => {
                        let already_failed = worker_failed.swap(true, Ordering::Relaxed);
                        last_failure = Some(Instant::now());
                        let message = panic_message(&panic);
                        tracing::error!(target: "logrich", error = %message, "queue worker panicked processing an event; entering degraded mode");
                        pipeline.report_queue_worker_error(&message);
                        if !already_failed {
                            pipeline.report_queue_degraded_drop_mode();
                        }
                    }
                }
            }
            Message::Shutdown { drain } => {
                if !drain {
                    break;
                }
                // FIFO ordering means any events sent before this message
                // were already processed in the loop above; nothing more
                // to drain.
                break;
            }
        }
    }

    finished.signal();
}

// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Domain layer for `logrich`: pure value objects, domain services, and
//! ports for a structured, multi-sink logging runtime.
//!
//! Nothing in this crate touches a clock, a socket, a file (beyond the ring
//! buffer's checkpoint contract, which is a domain-level invariant, not an
//! infrastructure choice), or an async runtime. The `logrich` crate wires
//! this layer to real time, real sinks, and a real queue.

pub mod context;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod levels;
pub mod ports;
pub mod rate_limiter;
pub mod ring_buffer;
pub mod sanitiser;
pub mod scrubber;
pub mod severity_monitor;
pub mod sink;
pub mod value;

pub use context::{ContextFrame, ContextStack};
pub use error::LogRichError;
pub use event::{LogEvent, PayloadLimits};
pub use levels::Severity;
pub use sink::Sink;
pub use value::Value;

// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Infrastructure layer: the bounded queue worker, sink adapters, and the
//! ring buffer dump renderer. Everything here is an implementation of a
//! port the domain/application layers define; nothing upstream of this
//! module knows which sinks are wired up or how the queue is backed.

pub mod dump;
pub mod queue;
pub mod sinks;

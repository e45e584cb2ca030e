// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Module
//!
//! Sits **outside** the enterprise application layers (domain, application,
//! infrastructure) of the `logrich` runtime and provides the pieces that
//! only make sense at the process boundary:
//!
//! - **Platform abstraction** - host identity and the journald-vs-Event-Log
//!   guard (POSIX vs Windows)
//! - **Signal handling** - graceful shutdown on SIGTERM/SIGINT/SIGHUP
//! - **Shutdown coordination** - cancellation token propagation with a
//!   grace period
//! - **Bootstrap logging** - the runtime's own operational logging,
//!   independent of the event pipeline it manages
//!
//! ## Architecture Position
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          BOOTSTRAP (This Module)            │
//! │  - Platform Abstraction                     │
//! │  - Signal Handling                          │
//! │  - Shutdown Coordination                    │
//! │  - Internal Logging                         │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │         APPLICATION LAYER (logrich)         │
//! │  - Processing Pipeline                      │
//! │  - Composition Root / Public API            │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │          DOMAIN LAYER (logrich-domain)      │
//! │  - Context, Events, Ring Buffer             │
//! │  - Rate Limiter, Scrubber, Sanitiser        │
//! └─────────────────────────────────────────────┘
//!                      ▲
//!                      │
//! ┌─────────────────────────────────────────────┐
//! │       INFRASTRUCTURE LAYER (logrich)        │
//! │  - Queue Worker, Sink Adapters               │
//! └─────────────────────────────────────────────┘
//! ```

pub mod logger;
pub mod platform;
pub mod shutdown;
pub mod signals;

pub use logger::{BootstrapLogger, ConsoleLogger};
pub use platform::{create_platform, Platform, PlatformError};
pub use shutdown::{CancellationToken, ShutdownCoordinator};

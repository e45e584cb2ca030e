// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # logrich
//!
//! An embeddable, structured, multi-sink logging runtime: context binding,
//! payload sanitisation, key-based redaction, rate limiting, a bounded
//! in-memory ring buffer, and fan-out to console/journald/Event Log/GELF
//! sinks, with optional decoupling through a bounded worker queue.
//!
//! ## Architecture
//!
//! The crate follows the same layering as [`logrich_domain`] and
//! [`logrich_bootstrap`]: domain types and ports are defined in
//! `logrich-domain`; this crate supplies the application orchestration and
//! infrastructure adapters, then wires them together behind a small public
//! API.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              runtime (this crate)           │
//! │  - RuntimeConfig (layered env/file config)  │
//! │  - Composition root (process singleton)     │
//! │  - Public API: init/bind/get/dump/shutdown  │
//! └─────────────────────────────────────────────┘
//!                      │
//! ┌─────────────────────────────────────────────┐
//! │              application (this crate)       │
//! │  - Processing pipeline orchestrator         │
//! │  - Scoped context binding                   │
//! └─────────────────────────────────────────────┘
//!                      │
//! ┌─────────────────────────────────────────────┐
//! │            logrich-domain                   │
//! │  - Context, event, sanitiser, scrubber      │
//! │  - Rate limiter, ring buffer, severity       │
//! │    monitor, sink port, diagnostics           │
//! └─────────────────────────────────────────────┘
//!                      ▲
//!                      │
//! ┌─────────────────────────────────────────────┐
//! │          infrastructure (this crate)        │
//! │  - Bounded queue worker                     │
//! │  - Sink adapters: console/journald/eventlog/│
//! │    gelf                                     │
//! │  - Ring buffer dump renderer                │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use logrich::runtime::api;
//! use logrich::runtime::config::RuntimeConfig;
//! use std::collections::BTreeMap;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RuntimeConfig::from_env()?;
//! api::init(config, None)?;
//!
//! let _scope = api::bind(
//!     api::BindFields::new()
//!         .service("billing")
//!         .environment("production")
//!         .job_id("job-1"),
//! )?;
//!
//! let logger = api::get("billing.worker")?;
//! logger.info("processed invoice", BTreeMap::new());
//!
//! api::shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod infrastructure;
pub mod runtime;

// Tests are organized as:
// - Unit tests: #[cfg(test)] modules within each source file
// - Integration tests: separate files in tests/ directory

pub use logrich_domain::diagnostics::{event_names, DiagnosticHook};
pub use logrich_domain::error::LogRichError;
pub use logrich_domain::levels::Severity;
pub use runtime::api::{bind, dump, get, init, inspect, is_initialised, shutdown, shutdown_async, BindFields, Logger, RuntimeInspection};
pub use runtime::composition_root::SubmitOutcome;
pub use runtime::config::RuntimeConfig;

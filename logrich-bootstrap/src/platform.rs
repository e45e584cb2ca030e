// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Platform Abstraction Module
//!
//! Platform-specific abstractions the structured-logging sinks need:
//! host identity, and the journald-vs-Event-Log guard that decides which
//! OS-native sink is available.
//!
//! ## Architecture Pattern
//!
//! Following hexagonal architecture principles:
//! - **Interface**: `Platform` trait defines the contract
//! - **Implementations**:
//!   - `UnixPlatform`: POSIX implementation (Linux + macOS), backs the
//!     journald sink
//!   - `WindowsPlatform`: Windows implementation, backs the Event Log sink
//! - **Selection**: Compile-time platform selection via `#[cfg]`
//!
//! The bootstrap module sits OUTSIDE the enterprise application layers, so
//! it can access platform-specific APIs directly without leaking `#[cfg]`
//! conditionals into the sink adapters themselves.

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::UnixPlatform;

#[cfg(windows)]
pub use windows::WindowsPlatform;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not supported on this platform: {0}")]
    NotSupported(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

/// Platform abstraction for the OS-specific operations the structured-log
/// sinks need.
///
/// All methods are stateless and thread-safe.
pub trait Platform: Send + Sync {
    /// The local hostname, used for the GELF `host` field and journald
    /// identity.
    fn hostname(&self) -> String;

    /// The current process id, attached to every event by the journald
    /// and Event Log sinks.
    fn process_id(&self) -> u32;

    /// The current OS user, used by the logging pipeline's identity-refresh
    /// step. Falls back to `"unknown"` if the environment carries no
    /// recognisable identity.
    fn username(&self) -> String;

    /// Platform identifier: `"linux"`, `"macos"`, `"windows"`.
    fn platform_name(&self) -> &'static str;

    /// Whether the journald sink's transport (`/dev/log`) is expected to
    /// be reachable on this platform at all. Always `false` on Windows.
    fn supports_journald(&self) -> bool;

    /// Whether the Event Log sink's transport is expected to be reachable
    /// on this platform at all. Always `false` on non-Windows.
    fn supports_eventlog(&self) -> bool;

    /// Whether the current process holds elevated privileges (root on
    /// Unix, Administrator on Windows). Some Event Log operations require
    /// this.
    fn is_elevated(&self) -> bool;
}

#[cfg(unix)]
type PlatformImpl = UnixPlatform;

#[cfg(windows)]
type PlatformImpl = WindowsPlatform;

/// Create the platform-specific implementation, selected at compile time.
pub fn create_platform() -> Box<dyn Platform> {
    Box::new(PlatformImpl::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_name_is_not_empty() {
        let platform = create_platform();
        assert!(!platform.platform_name().is_empty());
    }

    #[test]
    fn eventlog_transport_is_never_supported_on_unix() {
        let platform = create_platform();
        #[cfg(unix)]
        assert!(!platform.supports_eventlog());
        #[cfg(windows)]
        assert!(!platform.supports_journald());
    }

    #[test]
    fn hostname_is_not_empty() {
        let platform = create_platform();
        assert!(!platform.hostname().is_empty());
    }
}

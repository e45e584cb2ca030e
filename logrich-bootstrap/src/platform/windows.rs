// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Windows Platform Implementation
//!
//! Backs the Event Log sink with host identity and an elevated-privilege
//! check. Built with stub implementations on non-Windows hosts so the
//! crate still compiles (with `supports_eventlog()` reporting `false`)
//! when cross-compiled or built on the contributor's own machine.

use super::Platform;

pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        Self
    }

    #[cfg(windows)]
    fn is_elevated_impl() -> bool {
        // windows-sys doesn't expose IsUserAnAdmin directly; link it manually.
        #[link(name = "shell32")]
        extern "system" {
            fn IsUserAnAdmin() -> i32;
        }
        unsafe { IsUserAnAdmin() != 0 }
    }

    #[cfg(not(windows))]
    fn is_elevated_impl() -> bool {
        false
    }
}

impl Default for WindowsPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for WindowsPlatform {
    fn hostname(&self) -> String {
        gethostname::gethostname().to_string_lossy().into_owned()
    }

    fn process_id(&self) -> u32 {
        std::process::id()
    }

    fn username(&self) -> String {
        std::env::var("USERNAME").unwrap_or_else(|_| "unknown".to_string())
    }

    fn platform_name(&self) -> &'static str {
        "windows"
    }

    fn supports_journald(&self) -> bool {
        false
    }

    fn supports_eventlog(&self) -> bool {
        cfg!(windows)
    }

    fn is_elevated(&self) -> bool {
        Self::is_elevated_impl()
    }
}

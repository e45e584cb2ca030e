// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The Windows Event Log sink. Compiles on every platform (so the
//! composition root can reference it unconditionally); on non-Windows
//! hosts, construction fails fast with `InvalidConfiguration` rather than
//! the sink silently doing nothing, matching the platform guard's
//! auto-disable contract for `enable_eventlog`.

use logrich_domain::error::LogRichError;
use logrich_domain::event::LogEvent;
use logrich_domain::sink::Sink;

use super::flatten_fields;

pub struct EventLogSink {
    #[cfg(windows)]
    handle: windows_sys::Win32::Foundation::HANDLE,
    source: String,
}

// SAFETY: the Event Log handle is only ever touched from `write`, which
// takes `&self`; `ReportEventW` itself is documented safe for concurrent
// callers against the same handle.
#[cfg(windows)]
unsafe impl Send for EventLogSink {}
#[cfg(windows)]
unsafe impl Sync for EventLogSink {}

impl EventLogSink {
    #[cfg(windows)]
    pub fn register(source: impl Into<String>) -> Result<Self, LogRichError> {
        use std::iter;
        use windows_sys::Win32::System::EventLog::RegisterEventSourceW;

        let source = source.into();
        let wide: Vec<u16> = source.encode_utf16().chain(iter::once(0)).collect();
        let handle = unsafe { RegisterEventSourceW(std::ptr::null(), wide.as_ptr()) };
        if handle == 0 {
            return Err(LogRichError::sink_unavailable(
                "eventlog",
                format!("RegisterEventSourceW failed for source {source:?}"),
            ));
        }
        Ok(Self { handle, source })
    }

    #[cfg(not(windows))]
    pub fn register(_source: impl Into<String>) -> Result<Self, LogRichError> {
        Self::unsupported()
    }

    /// Always fails: used when `enable_eventlog` is requested on a
    /// platform that can't back it.
    pub fn unsupported() -> Result<Self, LogRichError> {
        Err(LogRichError::invalid_config(
            "eventlog sink requested but the Windows Event Log is not available on this platform",
        ))
    }
}

#[cfg(windows)]
impl Drop for EventLogSink {
    fn drop(&mut self) {
        use windows_sys::Win32::System::EventLog::DeregisterEventSource;
        unsafe {
            DeregisterEventSource(self.handle);
        }
    }
}

impl Sink for EventLogSink {
    fn name(&self) -> &'static str {
        "eventlog"
    }

    #[cfg(windows)]
    fn write(&self, event: &LogEvent) -> Result<(), LogRichError> {
        use std::iter;
        use windows_sys::Win32::System::EventLog::{
            ReportEventW, EVENTLOG_ERROR_TYPE, EVENTLOG_INFORMATION_TYPE, EVENTLOG_WARNING_TYPE,
        };
        use logrich_domain::levels::Severity;

        let event_type = match event.severity {
            Severity::Error | Severity::Critical => EVENTLOG_ERROR_TYPE,
            Severity::Warning => EVENTLOG_WARNING_TYPE,
            _ => EVENTLOG_INFORMATION_TYPE,
        };

        let mut record = format!("SOURCE={} MESSAGE={}", self.source, event.message);
        for (key, value) in flatten_fields(event) {
            record.push(' ');
            record.push_str(&key.to_ascii_uppercase());
            record.push('=');
            record.push_str(&value);
        }
        let wide: Vec<u16> = record.encode_utf16().chain(iter::once(0)).collect();
        let strings = [wide.as_ptr()];

        let ok = unsafe {
            ReportEventW(
                self.handle,
                event_type as u16,
                0,
                0,
                std::ptr::null(),
                strings.len() as u16,
                0,
                strings.as_ptr(),
                std::ptr::null(),
            )
        };
        if ok == 0 {
            return Err(LogRichError::sink_unavailable("eventlog", "ReportEventW failed"));
        }
        Ok(())
    }

    #[cfg(not(windows))]
    fn write(&self, _event: &LogEvent) -> Result<(), LogRichError> {
        let _ = &self.source;
        Err(LogRichError::PlatformUnsupported("eventlog"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_always_fails() {
        assert!(EventLogSink::unsupported().is_err());
    }

    #[cfg(not(windows))]
    #[test]
    fn register_fails_fast_off_windows() {
        assert!(EventLogSink::register("logrich").is_err());
    }
}

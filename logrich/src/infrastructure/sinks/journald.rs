// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The OS journal sink: writes to the classic `/dev/log` `SOCK_DGRAM` unix
//! socket in RFC 3164-style framing (`<PRI>` prefix, `ident[pid]:` tag),
//! with context and extras folded into the message as upper-cased
//! `KEY=VALUE` pairs. Real journald implementations (systemd-journald)
//! still listen on this socket for compatibility, so no native journald
//! protocol client is needed.

use std::os::unix::net::UnixDatagram;

use logrich_domain::error::LogRichError;
use logrich_domain::event::LogEvent;
use logrich_domain::sink::Sink;

use super::flatten_fields;

const DEFAULT_PATH: &str = "/dev/log";
const FACILITY_USER: u8 = 1;

pub struct JournaldSink {
    socket: UnixDatagram,
    ident: String,
    pid: u32,
}

impl JournaldSink {
    /// Connects to `/dev/log`. Fails fast (`SinkUnavailable`) if the
    /// socket is unreachable; the caller (composition root) is expected to
    /// skip installing this sink rather than retry, per the platform
    /// guard's auto-disable contract.
    pub fn connect(ident: impl Into<String>, pid: u32) -> Result<Self, LogRichError> {
        Self::connect_to(DEFAULT_PATH, ident, pid)
    }

    pub fn connect_to(path: &str, ident: impl Into<String>, pid: u32) -> Result<Self, LogRichError> {
        let socket = UnixDatagram::unbound().map_err(|err| LogRichError::sink_unavailable("journald", err.to_string()))?;
        socket
            .connect(path)
            .map_err(|err| LogRichError::sink_unavailable("journald", err.to_string()))?;
        Ok(Self {
            socket,
            ident: ident.into(),
            pid,
        })
    }
}

impl Sink for JournaldSink {
    fn name(&self) -> &'static str {
        "journald"
    }

    fn write(&self, event: &LogEvent) -> Result<(), LogRichError> {
        let pri = FACILITY_USER * 8 + event.severity.syslog_level();
        let mut message = format!("MESSAGE={}", event.message);
        for (key, value) in flatten_fields(event) {
            message.push(' ');
            message.push_str(&key.to_ascii_uppercase());
            message.push('=');
            message.push_str(&value);
        }
        let record = format!("<{}>{}[{}]: {}", pri, self.ident, self.pid, message);
        self.socket
            .send(record.as_bytes())
            .map(|_| ())
            .map_err(|err| LogRichError::sink_unavailable("journald", err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use logrich_domain::levels::Severity;
    use std::os::unix::net::UnixDatagram as StdUnixDatagram;
    use tempfile::tempdir;

    #[test]
    fn sends_a_pri_prefixed_datagram_to_dev_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.sock");
        let listener = StdUnixDatagram::bind(&path).unwrap();

        let sink = JournaldSink::connect_to(path.to_str().unwrap(), "logrich", 42).unwrap();
        let event = LogEvent::new("id-1".into(), Utc::now(), Severity::Error, "svc", "disk full");
        sink.write(&event).unwrap();

        let mut buf = [0u8; 512];
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        let received = String::from_utf8_lossy(&buf[..n]);
        assert!(received.starts_with("<11>logrich[42]:"));
        assert!(received.contains("MESSAGE=disk full"));
    }
}

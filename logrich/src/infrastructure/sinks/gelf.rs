// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The GELF (Graylog Extended Log Format) remote sink: TCP (NUL-framed,
//! reconnect-on-failure), UDP (one datagram per event, no fragmentation),
//! and TLS (rustls, hostname-verified) transports over the same JSON
//! payload shape.
//!
//! `Sink::write` runs synchronously on the queue worker's dedicated
//! thread, so this adapter uses blocking `std::net` sockets and, for TLS,
//! `rustls::StreamOwned` rather than an async client — there's no runtime
//! to drive here.

use std::io::Write as _;
use std::net::{TcpStream, UdpSocket};
use std::sync::Arc;

use logrich_domain::error::LogRichError;
use logrich_domain::event::LogEvent;
use logrich_domain::sink::Sink;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustls::pki_types::ServerName;
use serde_json::{json, Map, Value};

use super::flatten_fields;

// rustls 0.23 requires a process-wide default `CryptoProvider` before the
// first `ClientConfig::builder()` call. Only the `ring` feature is
// compiled in, so this installs it once, lazily, on first TLS sink use.
static INIT_CRYPTO_PROVIDER: Lazy<()> = Lazy::new(|| {
    let _ = rustls::crypto::ring::default_provider().install_default();
});

fn build_payload(local_hostname: &str, event: &LogEvent) -> Vec<u8> {
    let mut map = Map::new();
    map.insert("version".to_string(), json!("1.1"));
    map.insert("host".to_string(), json!(local_hostname));
    map.insert("short_message".to_string(), json!(event.message));
    map.insert("level".to_string(), json!(event.severity.syslog_level()));
    let timestamp = event.timestamp.timestamp() as f64 + event.timestamp.timestamp_subsec_nanos() as f64 / 1e9;
    map.insert("timestamp".to_string(), json!(timestamp));
    for (key, value) in flatten_fields(event) {
        map.insert(format!("_{key}"), Value::String(value));
    }
    serde_json::to_vec(&Value::Object(map)).unwrap_or_default()
}

enum Transport {
    Udp(UdpSocket),
    Tcp {
        addr: String,
        stream: Option<TcpStream>,
    },
    Tls {
        addr: String,
        server_name: ServerName<'static>,
        config: Arc<rustls::ClientConfig>,
        stream: Option<rustls::StreamOwned<rustls::ClientConnection, TcpStream>>,
    },
}

pub struct GelfSink {
    local_hostname: String,
    transport: Mutex<Transport>,
}

impl GelfSink {
    pub fn udp(local_hostname: impl Into<String>, addr: &str) -> Result<Self, LogRichError> {
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(|err| LogRichError::sink_unavailable("gelf", err.to_string()))?;
        socket
            .connect(addr)
            .map_err(|err| LogRichError::sink_unavailable("gelf", err.to_string()))?;
        Ok(Self {
            local_hostname: local_hostname.into(),
            transport: Mutex::new(Transport::Udp(socket)),
        })
    }

    pub fn tcp(local_hostname: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            local_hostname: local_hostname.into(),
            transport: Mutex::new(Transport::Tcp {
                addr: addr.into(),
                stream: None,
            }),
        }
    }

    /// Builds a TLS transport with the host's native trust roots, hostname
    /// verification enabled (the default `rustls::ClientConfig` behaviour).
    pub fn tls(local_hostname: impl Into<String>, addr: impl Into<String>, server_hostname: &str) -> Result<Self, LogRichError> {
        Lazy::force(&INIT_CRYPTO_PROVIDER);
        let mut roots = rustls::RootCertStore::empty();
        for cert in rustls_native_certs::load_native_certs().certs {
            roots.add(cert).ok();
        }
        if roots.is_empty() {
            return Err(LogRichError::sink_unavailable("gelf", "no trusted root certificates found"));
        }
        let config = rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        let server_name = ServerName::try_from(server_hostname.to_string())
            .map_err(|_| LogRichError::sink_unavailable("gelf", format!("invalid TLS server name: {server_hostname}")))?;
        Ok(Self {
            local_hostname: local_hostname.into(),
            transport: Mutex::new(Transport::Tls {
                addr: addr.into(),
                server_name,
                config: Arc::new(config),
                stream: None,
            }),
        })
    }
}

impl Sink for GelfSink {
    fn name(&self) -> &'static str {
        "gelf"
    }

    fn write(&self, event: &LogEvent) -> Result<(), LogRichError> {
        let payload = build_payload(&self.local_hostname, event);
        let mut transport = self.transport.lock();
        match &mut *transport {
            Transport::Udp(socket) => socket
                .send(&payload)
                .map(|_| ())
                .map_err(|err| LogRichError::sink_unavailable("gelf", err.to_string())),
            Transport::Tcp { addr, stream } => {
                if stream.is_none() {
                    *stream = Some(TcpStream::connect(addr.as_str()).map_err(|err| LogRichError::sink_unavailable("gelf", err.to_string()))?);
                }
                let result = stream.as_mut().unwrap().write_all(&payload).and_then(|_| stream.as_mut().unwrap().write_all(&[0u8]));
                if result.is_err() {
                    *stream = None;
                }
                result.map_err(|err| LogRichError::sink_unavailable("gelf", err.to_string()))
            }
            Transport::Tls {
                addr,
                server_name,
                config,
                stream,
            } => {
                if stream.is_none() {
                    let conn = rustls::ClientConnection::new(config.clone(), server_name.clone())
                        .map_err(|err| LogRichError::sink_unavailable("gelf", err.to_string()))?;
                    let tcp = TcpStream::connect(addr.as_str()).map_err(|err| LogRichError::sink_unavailable("gelf", err.to_string()))?;
                    *stream = Some(rustls::StreamOwned::new(conn, tcp));
                }
                let result = stream
                    .as_mut()
                    .unwrap()
                    .write_all(&payload)
                    .and_then(|_| stream.as_mut().unwrap().flush());
                if result.is_err() {
                    *stream = None;
                }
                result.map_err(|err| LogRichError::sink_unavailable("gelf", err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use logrich_domain::levels::Severity;
    use std::io::Read;
    use std::net::{TcpListener, UdpSocket as StdUdpSocket};

    #[test]
    fn udp_sends_one_datagram_per_event() {
        let listener = StdUdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let sink = GelfSink::udp("producer-host", &addr.to_string()).unwrap();
        let event = LogEvent::new("id-1".into(), Utc::now(), Severity::Error, "svc", "oops");
        sink.write(&event).unwrap();

        let mut buf = [0u8; 4096];
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        let parsed: Value = serde_json::from_slice(&buf[..n]).unwrap();
        assert_eq!(parsed["version"], "1.1");
        assert_eq!(parsed["short_message"], "oops");
        assert_eq!(parsed["level"], 3);
    }

    #[test]
    fn tcp_frames_payload_with_trailing_nul() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let sink = GelfSink::tcp("producer-host", addr.to_string());
        let event = LogEvent::new("id-1".into(), Utc::now(), Severity::Info, "svc", "hello");

        let (accepted, _) = std::thread::scope(|s| {
            let handle = s.spawn(|| listener.accept().unwrap());
            sink.write(&event).unwrap();
            handle.join().unwrap()
        });
        let mut stream = accepted;
        let mut buf = Vec::new();
        stream.set_read_timeout(Some(std::time::Duration::from_millis(200))).unwrap();
        let _ = stream.read_to_end(&mut buf);
        assert_eq!(buf.last(), Some(&0u8));
    }
}

use {
    async_trait::async_trait,
    bytes::BytesMut,
    log::{debug, warn},
    std::{sync::Arc, time::Duration},
    tokio::{
        io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
        net::TcpStream,
        time::timeout,
    },
};

use super::diagnostics::{DiagnosticEvent, DiagnosticSink, LogSink};
use super::record::TelemetryRecord;
use crate::error::Error;

/// The only request the device understands. No terminator is needed.
pub const COMMAND: &[u8] = b"wifilocalMonitor:get dev real infor";

pub const DEFAULT_PORT: u16 = 53970;

const CONNECT_TIMEOUT_MS: u64 = 3000;
const WRITE_TIMEOUT_MS: u64 = 3000;
const READ_TIMEOUT_MS: u64 = 500; // per read attempt
const READ_ATTEMPTS: u32 = 10;
const MAX_RESPONSE_SIZE: usize = 16384;

// Endpoint {{{
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
} // }}}

// TransportSettings {{{
/// Timing knobs for one fetch. Worst case a fetch takes
/// `connect_timeout + write_timeout + read_timeout * read_attempts`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    pub read_timeout: Duration,
    pub read_attempts: u32,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(CONNECT_TIMEOUT_MS),
            write_timeout: Duration::from_millis(WRITE_TIMEOUT_MS),
            read_timeout: Duration::from_millis(READ_TIMEOUT_MS),
            read_attempts: READ_ATTEMPTS,
        }
    }
} // }}}

/// Anything that can hand back one telemetry record per call.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    fn endpoint(&self) -> &Endpoint;

    async fn fetch(&self) -> Result<TelemetryRecord, Error>;
}

#[derive(Clone)]
pub struct Client {
    endpoint: Endpoint,
    settings: TransportSettings,
    sink: Arc<dyn DiagnosticSink>,
}

impl Client {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            settings: TransportSettings::default(),
            sink: Arc::new(LogSink),
        }
    }

    pub fn with_settings(mut self, settings: TransportSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    /// Send the request and return the trimmed response text.
    ///
    /// The connection is shut down before returning on every path; if the
    /// future is dropped part way, dropping the stream closes it.
    pub async fn fetch_text(&self) -> Result<String, Error> {
        debug!("connecting to {}", self.endpoint);

        let stream = match timeout(
            self.settings.connect_timeout,
            TcpStream::connect((self.endpoint.host(), self.endpoint.port())),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(self.connection_failed(e)),
            Err(_) => {
                return Err(self.connection_failed(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!(
                        "connect timed out after {}ms",
                        self.settings.connect_timeout.as_millis()
                    ),
                )))
            }
        };

        self.fetch_text_from(stream).await
    }

    /// Run one request/response exchange over an already open stream.
    ///
    /// The stream is shut down and dropped before this returns.
    pub async fn fetch_text_from<S>(&self, mut stream: S) -> Result<String, Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let result = self.exchange(&mut stream).await;

        if let Err(e) = stream.shutdown().await {
            debug!("{}: shutdown: {}", self.endpoint, e);
        }
        drop(stream);

        let buf = result?;
        if buf.is_empty() {
            return Err(Error::EmptyResponse {
                endpoint: self.endpoint.clone(),
            });
        }

        let text = decode(&buf);
        self.sink.event(&DiagnosticEvent::Raw {
            endpoint: self.endpoint.to_string(),
            text: text.clone(),
        });

        Ok(text)
    }

    async fn exchange<S>(&self, stream: &mut S) -> Result<BytesMut, Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let write = async {
            stream.write_all(COMMAND).await?;
            stream.flush().await?;
            Ok::<(), std::io::Error>(())
        };

        match timeout(self.settings.write_timeout, write).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(self.write_failed(e)),
            Err(_) => {
                return Err(self.write_failed(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!(
                        "write timed out after {}ms",
                        self.settings.write_timeout.as_millis()
                    ),
                )))
            }
        }
        debug!("{}: TX {:?}", self.endpoint, String::from_utf8_lossy(COMMAND));

        Ok(self.read_response(stream).await)
    }

    /// Collect bytes until the payload looks complete.
    ///
    /// There is no framing: stop at the first `}` seen, at a read that
    /// times out (nothing more coming), at EOF, or after `read_attempts`.
    async fn read_response<S>(&self, stream: &mut S) -> BytesMut
    where
        S: AsyncRead + Unpin,
    {
        let mut buf = BytesMut::with_capacity(4096);

        for attempt in 1..=self.settings.read_attempts {
            if buf.len() >= MAX_RESPONSE_SIZE {
                warn!(
                    "{}: response exceeds {} bytes, giving up reading",
                    self.endpoint, MAX_RESPONSE_SIZE
                );
                break;
            }

            match timeout(self.settings.read_timeout, stream.read_buf(&mut buf)).await {
                Ok(Ok(0)) => {
                    debug!("{}: connection closed by peer", self.endpoint);
                    break;
                }
                Ok(Ok(n)) => {
                    debug!("{}: RX {} bytes (attempt {})", self.endpoint, n, attempt);
                    if buf.contains(&b'}') {
                        break;
                    }
                }
                Ok(Err(e)) => {
                    warn!("{}: read error: {}", self.endpoint, e);
                    break;
                }
                Err(_) => {
                    debug!(
                        "{}: no data for {}ms after {} bytes",
                        self.endpoint,
                        self.settings.read_timeout.as_millis(),
                        buf.len()
                    );
                    break;
                }
            }
        }

        buf
    }

    fn connection_failed(&self, source: std::io::Error) -> Error {
        Error::ConnectionFailed {
            endpoint: self.endpoint.clone(),
            source,
        }
    }

    fn write_failed(&self, source: std::io::Error) -> Error {
        Error::WriteFailed {
            endpoint: self.endpoint.clone(),
            source,
        }
    }
}

#[async_trait]
impl TelemetrySource for Client {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn fetch(&self) -> Result<TelemetryRecord, Error> {
        let text = self.fetch_text().await?;
        super::parse(&text, self.sink.as_ref())
    }
}

/// ASCII decode that silently drops anything outside the 7-bit range.
pub fn decode(bytes: &[u8]) -> String {
    let text: String = bytes
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| char::from(b))
        .collect();

    text.trim().to_string()
}

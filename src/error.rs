use thiserror::Error;

use crate::felicity::client::Endpoint;

/// Failures from one telemetry fetch.
///
/// The transport never retries; a caller wanting another attempt simply
/// fetches again.
#[derive(Error, Debug)]
pub enum Error {
    /// The socket could not be opened (refused, unreachable, DNS, timeout).
    #[error("error talking to {endpoint}: {source}")]
    ConnectionFailed {
        endpoint: Endpoint,
        #[source]
        source: std::io::Error,
    },

    /// Writing or flushing the request failed.
    #[error("failed to send request to {endpoint}: {source}")]
    WriteFailed {
        endpoint: Endpoint,
        #[source]
        source: std::io::Error,
    },

    /// The read loop finished without a single byte.
    #[error("no data received from {endpoint}")]
    EmptyResponse { endpoint: Endpoint },

    /// The payload lacked both core battery groups.
    #[error("invalid payload from device ({reason}): {text}")]
    ParseFailed { reason: String, text: String },
}

impl Error {
    /// The payload text attached to a parse failure.
    pub fn text(&self) -> Option<&str> {
        match self {
            Error::ParseFailed { text, .. } => Some(text),
            _ => None,
        }
    }
}

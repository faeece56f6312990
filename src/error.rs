//! Error kinds surfaced by the client.
//!
//! `CallbackError` from the spec has no variant here: a panicking user callback is caught at the
//! spawn boundary and logged (see [`crate::client`]), never bubbled up as a value.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open the TCP connection within the configured timeout.
    #[error("failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// The connection timed out before the TCP handshake completed.
    #[error("connection to {host}:{port} timed out after {timeout:?}")]
    ConnectTimedOut {
        host: String,
        port: u16,
        timeout: std::time::Duration,
    },

    /// The server rejected the login action.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The connection dropped, was reset, or the peer sent `Event: Shutdown`.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// A packet could not be parsed; the offending packet is dropped and the read loop
    /// continues.
    #[error("failed to frame packet: {0}")]
    FramingError(String),
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::ConnectionLost(source.to_string())
    }
}

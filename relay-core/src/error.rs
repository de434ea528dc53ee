//! Error types shared by the relay server and probe client.

use thiserror::Error;

/// Relay protocol errors.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Transport error (connect, handshake, I/O).
    #[error("transport error: {0}")]
    Transport(String),

    /// Protocol-level error (unexpected frame, bad upgrade path).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Peer closed the connection before a reply arrived.
    #[error("connection closed by peer")]
    ConnectionClosed,
}

/// Result type alias for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

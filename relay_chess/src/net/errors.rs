//! Network error types for the wire codec and relay channels.

use thiserror::Error;

/// Errors that can occur while encoding or decoding relay frames
#[derive(Debug, Error)]
pub enum CodecError {
    /// Failed to encode a message
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// Failed to decode a message
    #[error("Failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    /// Message size exceeded maximum allowed
    #[error("Message size {actual} exceeds maximum {max}")]
    MessageTooLarge { actual: usize, max: usize },
}

/// Errors from a relay connection
#[derive(Debug, Error)]
pub enum RelayError {
    /// Couldn't open the channel
    #[error("Failed to connect to relay: {0}")]
    Connect(String),

    /// The underlying transport failed mid-session
    #[error("Relay transport error: {0}")]
    Transport(String),

    /// The channel was already closed
    #[error("Relay channel closed")]
    Closed,

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

//! Protocol error types

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Outgoing envelope could not be serialized
    #[error("Encoding error: {0}")]
    Encoding(#[source] serde_json::Error),

    /// Incoming payload is not a valid response
    #[error("Decoding error: {0}")]
    Decoding(#[source] serde_json::Error),

    /// Payload contained nothing but padding
    #[error("Empty payload")]
    EmptyPayload,

    /// Non-padding bytes follow the response
    #[error("Unexpected trailing data at byte {offset}")]
    TrailingData { offset: usize },

    /// Stream ended in the middle of a payload
    #[error("Truncated payload: stream closed with {buffered} bytes buffered")]
    Truncated { buffered: usize },

    /// Payload exceeds maximum size
    #[error("Payload too large: {size} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

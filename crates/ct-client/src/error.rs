//! Client error types

use std::io;

use ct_core::ConfigError;
use ct_protocol::ProtocolError;
use thiserror::Error;

use crate::state::ClientState;

/// Exit status of the agent after a fatal error
pub const FATAL_EXIT_CODE: i32 = 2;

/// Errors surfaced by the Kernel client
///
/// None of these are recoverable by the client itself: after any of them
/// (except [`ClientError::InvalidState`]) the client is terminated and the
/// caller is expected to exit and let the supervisor restart it.
#[derive(Error, Debug)]
pub enum ClientError {
    /// A required startup value is missing or invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The Kernel could not be reached
    #[error("Failed to connect to Kernel at {address}: {source}")]
    Connection {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Writing a command to the Kernel failed
    #[error("Failed to write to Kernel: {0}")]
    Write(#[source] io::Error),

    /// Reading a response from the Kernel failed
    #[error("Failed to read from Kernel: {0}")]
    Read(#[source] io::Error),

    /// An outgoing command could not be serialized
    #[error("Failed to encode command: {0}")]
    Encoding(#[source] ProtocolError),

    /// A response from the Kernel could not be parsed
    #[error("Failed to decode Kernel response: {0}")]
    Decoding(#[source] ProtocolError),

    /// The Kernel answered with a non-success status
    #[error("Kernel rejected '{command}' with status {status}: {message}")]
    Rejected {
        command: String,
        status: i64,
        message: String,
    },

    /// The Kernel acknowledged a different command than the one sent
    #[error("Kernel acknowledged '{actual}' in reply to '{expected}'")]
    UnexpectedAck { expected: String, actual: String },

    /// The operation is not allowed in the client's current state
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: ClientState,
    },

    /// The client's cancellation token fired mid-operation
    #[error("Operation cancelled")]
    Cancelled,
}

impl ClientError {
    /// Build a read error for a peer that closed the connection
    pub(crate) fn closed_by_peer() -> Self {
        ClientError::Read(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed by Kernel",
        ))
    }

    /// Whether the error happened on the wire (as opposed to config or state)
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            ClientError::Connection { .. } | ClientError::Write(_) | ClientError::Read(_)
        )
    }

    /// Whether the error came from a deadline expiring
    pub fn is_timeout(&self) -> bool {
        match self {
            ClientError::Connection { source, .. }
            | ClientError::Write(source)
            | ClientError::Read(source) => source.kind() == io::ErrorKind::TimedOut,
            _ => false,
        }
    }
}

//! Message types for the Kernel protocol
//!
//! # Message Flow
//!
//! 1. Agent dials the Kernel and sends a `connect` command
//! 2. Kernel answers with a [`Response`]; anything but status 200 is a rejection
//! 3. Agent sends further commands (e.g. `heartbeat`), one at a time, each
//!    carrying a fresh [`StatusReport`]
//!
//! # Response Schema
//!
//! The canonical response is `{"status": 200, "message": "ok"}`. Older Kernels
//! answer with `{"command": "connect"}`, echoing the request; that form is
//! accepted when the echoed name matches the command that was sent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Handshake command, sent once right after dialing.
pub const CONNECT: &str = "connect";

/// Liveness command, sent periodically once connected.
pub const HEARTBEAT: &str = "heartbeat";

/// Status code the Kernel uses for success.
pub const STATUS_OK: i64 = 200;

/// Point-in-time status as it travels on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// When the agent started
    pub started_at: DateTime<Utc>,
    /// When this report was refreshed
    pub updated_at: DateTime<Utc>,
    /// Resident memory of the agent process, in bytes
    pub consumed_memory: u64,
    /// Virtual memory reserved by the agent process, in bytes
    pub allocated_memory: u64,
}

/// Outgoing command envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Command name (e.g. `connect`, `heartbeat`)
    pub command: String,
    /// Token of the emitting agent. The Kernel expects the key spelled `emmitter`.
    #[serde(rename = "emmitter")]
    pub emitter: String,
    /// Status snapshot taken right before sending
    pub status: StatusReport,
}

impl CommandEnvelope {
    /// Create a new envelope
    pub fn new(command: impl Into<String>, emitter: impl Into<String>, status: StatusReport) -> Self {
        Self {
            command: command.into(),
            emitter: emitter.into(),
            status,
        }
    }
}

/// Incoming response envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// Status and human-readable message
    Status {
        /// HTTP-style status code, 200 on success. Any integer is accepted so
        /// that odd codes still surface as rejections.
        status: i64,
        /// Explanation from the Kernel. Missing or `null` reads as empty.
        #[serde(default, deserialize_with = "null_as_empty")]
        message: String,
    },

    /// Legacy acknowledgement echoing the command name
    Echo {
        /// The echoed command
        command: String,
    },
}

impl Response {
    /// Build a canonical status response
    pub fn status(status: i64, message: impl Into<String>) -> Self {
        Response::Status {
            status,
            message: message.into(),
        }
    }

    /// Build a legacy echo response
    pub fn echo(command: impl Into<String>) -> Self {
        Response::Echo {
            command: command.into(),
        }
    }

    /// Whether this response acknowledges `command`.
    ///
    /// A status response acknowledges any command when its status is 200.
    /// An echo response only acknowledges the command it names.
    pub fn acknowledges(&self, command: &str) -> bool {
        match self {
            Response::Status { status, .. } => *status == STATUS_OK,
            Response::Echo { command: echoed } => echoed == command,
        }
    }

    /// Status code, if this is a canonical response
    pub fn status_code(&self) -> Option<i64> {
        match self {
            Response::Status { status, .. } => Some(*status),
            Response::Echo { .. } => None,
        }
    }

    /// Human-readable explanation of the response
    pub fn message(&self) -> &str {
        match self {
            Response::Status { message, .. } => message,
            Response::Echo { command } => command,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

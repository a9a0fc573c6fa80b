//! ct-protocol: Wire protocol between a worker agent and the Kernel
//!
//! Messages are JSON objects exchanged over a single TCP connection, one
//! command and one response per round trip. This crate defines the envelopes,
//! the JSON codec and the stream framing used to find message boundaries.

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;

pub use codec::{decode_response, encode_command};
pub use error::ProtocolError;
pub use frame::{Framing, KernelFramer, LENGTH_PREFIX_SIZE, MAX_PAYLOAD_SIZE};
pub use message::{CommandEnvelope, Response, StatusReport, CONNECT, HEARTBEAT, STATUS_OK};

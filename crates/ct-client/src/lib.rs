//! ct-client: Worker-side agent for the Kernel
//!
//! The agent dials the supervising Kernel, registers with its service token
//! and then reports a status snapshot (uptime, memory usage) with every
//! command it sends. Any failure is fatal for the agent; the Kernel's process
//! supervision is responsible for restarting it.

pub mod error;
pub mod heartbeat;
pub mod kernel;
pub mod metrics;
pub mod state;

pub use error::{ClientError, FATAL_EXIT_CODE};
pub use kernel::{KernelClient, KernelConnection, SharedKernelClient};
pub use metrics::StatusSnapshot;
pub use state::ClientState;

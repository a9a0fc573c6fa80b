//! Communication with the Kernel

mod client;
mod connection;

pub use client::{KernelClient, SharedKernelClient};
pub use connection::KernelConnection;

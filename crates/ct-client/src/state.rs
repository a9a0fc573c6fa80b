//! Client lifecycle state

use std::fmt;

/// Lifecycle of a [`KernelClient`](crate::kernel::KernelClient)
///
/// ```text
/// Unconnected --connect--> Connecting --ack--> Connected --shutdown/error--> Terminated
///                              |                                                ^
///                              +------------------- error ----------------------+
/// ```
///
/// `Terminated` is absorbing: a terminated client never connects again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Created, no connection attempted yet
    Unconnected,
    /// Dialing the Kernel or waiting for the handshake response
    Connecting,
    /// Handshake accepted; commands may be sent
    Connected,
    /// Connection closed after shutdown or a fatal error
    Terminated,
}

impl ClientState {
    /// Whether the client can still be used
    pub fn is_terminated(&self) -> bool {
        matches!(self, ClientState::Terminated)
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientState::Unconnected => write!(f, "unconnected"),
            ClientState::Connecting => write!(f, "connecting"),
            ClientState::Connected => write!(f, "connected"),
            ClientState::Terminated => write!(f, "terminated"),
        }
    }
}

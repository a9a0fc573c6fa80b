//! Kernel client: handshake, commands and shutdown over one connection

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use ct_core::ClientConfig;
use ct_protocol::{decode_response, encode_command, CommandEnvelope, Response, CONNECT, HEARTBEAT};

use super::connection::KernelConnection;
use crate::error::ClientError;
use crate::metrics::StatusSnapshot;
use crate::state::ClientState;

/// A client shared between tasks. The mutex is held for a whole exchange,
/// which keeps every response paired with its request.
pub type SharedKernelClient = Arc<Mutex<KernelClient>>;

/// Session with the Kernel
///
/// Owns the connection exclusively. Every operation either succeeds or
/// closes the connection and leaves the client [`ClientState::Terminated`];
/// deciding whether to exit or restart is up to the caller.
#[derive(Debug)]
pub struct KernelClient {
    config: ClientConfig,
    state: ClientState,
    connection: Option<KernelConnection>,
    snapshot: StatusSnapshot,
    cancel: CancellationToken,
}

impl KernelClient {
    /// Create a client. Fails if the configuration is incomplete; nothing
    /// touches the network until [`connect`](Self::connect).
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        Ok(Self {
            config,
            state: ClientState::Unconnected,
            connection: None,
            snapshot: StatusSnapshot::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Use `cancel` to abort in-flight operations
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that aborts in-flight operations when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wrap the client for use from several tasks
    pub fn into_shared(self) -> SharedKernelClient {
        Arc::new(Mutex::new(self))
    }

    /// Current lifecycle state
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Token presented to the Kernel
    pub fn token(&self) -> &str {
        &self.config.token
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Status sent with the most recent command
    pub fn snapshot(&self) -> &StatusSnapshot {
        &self.snapshot
    }

    /// Dial the Kernel and perform the `connect` handshake
    pub async fn connect(&mut self) -> Result<Response, ClientError> {
        if self.state != ClientState::Unconnected {
            return Err(ClientError::InvalidState {
                operation: "connect",
                state: self.state,
            });
        }

        self.state = ClientState::Connecting;
        let result = self.handshake().await;
        self.settle(result).await
    }

    /// Send `command` with a fresh status snapshot and return the Kernel's answer
    pub async fn send_command(&mut self, command: &str) -> Result<Response, ClientError> {
        if self.state != ClientState::Connected {
            return Err(ClientError::InvalidState {
                operation: "send a command",
                state: self.state,
            });
        }

        tracing::debug!(command, "Sending command to Kernel");
        let result = self.exchange(command).await;
        self.settle(result).await
    }

    /// Report liveness
    pub async fn heartbeat(&mut self) -> Result<Response, ClientError> {
        self.send_command(HEARTBEAT).await
    }

    /// Close the connection. The client cannot be used afterwards.
    pub async fn shutdown(&mut self) {
        if self.state.is_terminated() {
            return;
        }
        tracing::info!("Shutting down Kernel connection");
        self.terminate().await;
    }

    async fn handshake(&mut self) -> Result<Response, ClientError> {
        let address = self.config.kernel_address();
        tracing::info!("Connecting to Kernel at {}", address);

        let dial = KernelConnection::dial(
            &address,
            self.config.framing,
            self.config.connect_deadline(),
            self.config.request_deadline(),
        );
        let connection = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ClientError::Cancelled),
            result = dial => result?,
        };
        self.connection = Some(connection);

        let response = self.exchange(CONNECT).await?;
        self.state = ClientState::Connected;
        tracing::info!("Registered with Kernel: {}", response.message());
        Ok(response)
    }

    /// One request/response round trip on the open connection
    async fn exchange(&mut self, command: &str) -> Result<Response, ClientError> {
        self.snapshot.refresh();
        let envelope = CommandEnvelope::new(command, self.config.token.as_str(), self.snapshot.report());
        let payload = encode_command(&envelope).map_err(ClientError::Encoding)?;

        let state = self.state;
        let connection = self.connection.as_mut().ok_or(ClientError::InvalidState {
            operation: "send a command",
            state,
        })?;

        let bytes = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ClientError::Cancelled),
            result = connection.round_trip(Bytes::from(payload)) => result?,
        };

        let response = decode_response(&bytes).map_err(ClientError::Decoding)?;
        verify(command, response)
    }

    async fn settle(
        &mut self,
        result: Result<Response, ClientError>,
    ) -> Result<Response, ClientError> {
        if let Err(ref e) = result {
            tracing::error!(state = %self.state, "Kernel exchange failed: {}", e);
            self.terminate().await;
        }
        result
    }

    async fn terminate(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close().await;
        }
        self.state = ClientState::Terminated;
    }
}

/// Accept `response` only if it acknowledges `command`
fn verify(command: &str, response: Response) -> Result<Response, ClientError> {
    if response.acknowledges(command) {
        return Ok(response);
    }

    match response {
        Response::Status { status, message } => Err(ClientError::Rejected {
            command: command.to_string(),
            status,
            message,
        }),
        Response::Echo { command: actual } => Err(ClientError::UnexpectedAck {
            expected: command.to_string(),
            actual,
        }),
    }
}

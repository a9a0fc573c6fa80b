//! TCP connection to the Kernel

use std::future::Future;
use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use ct_protocol::{Framing, KernelFramer, ProtocolError};

use crate::error::ClientError;

/// Run `fut` under an optional deadline, mapping expiry to `TimedOut`
async fn with_deadline<T, F>(deadline: Option<Duration>, fut: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
            Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("deadline of {:?} exceeded", limit),
            ))
        }),
        None => fut.await,
    }
}

fn into_io_error(error: ProtocolError) -> Result<io::Error, ProtocolError> {
    match error {
        ProtocolError::Io(e) => Ok(e),
        other => Err(other),
    }
}

/// An open connection to the Kernel
///
/// Carries one exchange at a time: the owner writes a payload, then reads
/// exactly one response payload. Closing is idempotent.
#[derive(Debug)]
pub struct KernelConnection {
    address: String,
    framed: Option<Framed<TcpStream, KernelFramer>>,
    io_timeout: Option<Duration>,
}

impl KernelConnection {
    /// Dial the Kernel. Fails immediately on refusal; there is no retry.
    pub async fn dial(
        address: &str,
        framing: Framing,
        connect_timeout: Option<Duration>,
        io_timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        tracing::debug!("Connecting to Kernel at {}", address);

        let stream = with_deadline(connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|source| ClientError::Connection {
                address: address.to_string(),
                source,
            })?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Failed to set TCP_NODELAY: {}", e);
        }

        Ok(Self {
            address: address.to_string(),
            framed: Some(Framed::new(stream, KernelFramer::new(framing))),
            io_timeout,
        })
    }

    /// Address this connection was dialed to
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether the connection has been closed
    pub fn is_closed(&self) -> bool {
        self.framed.is_none()
    }

    fn framed(&mut self) -> io::Result<&mut Framed<TcpStream, KernelFramer>> {
        self.framed
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection closed"))
    }

    /// Write one payload, framed, and flush it
    pub async fn send(&mut self, payload: Bytes) -> Result<(), ClientError> {
        let deadline = self.io_timeout;
        let framed = self.framed().map_err(ClientError::Write)?;
        let len = payload.len();

        with_deadline(deadline, async {
            framed.send(payload).await.map_err(|e| {
                into_io_error(e)
                    .unwrap_or_else(|other| io::Error::new(io::ErrorKind::InvalidInput, other))
            })
        })
        .await
        .map_err(ClientError::Write)?;
        tracing::trace!(len, "Sent payload to Kernel");
        Ok(())
    }

    /// Read exactly one response payload
    pub async fn receive(&mut self) -> Result<BytesMut, ClientError> {
        let deadline = self.io_timeout;
        let framed = self.framed().map_err(ClientError::Read)?;

        let next = with_deadline(deadline, async { Ok(framed.next().await) })
            .await
            .map_err(ClientError::Read)?;

        let payload = match next {
            Some(Ok(payload)) => payload,
            Some(Err(e)) => {
                return Err(match into_io_error(e) {
                    Ok(io) => ClientError::Read(io),
                    Err(protocol) => ClientError::Decoding(protocol),
                })
            }
            None => return Err(ClientError::closed_by_peer()),
        };

        // One response per request: anything still buffered was never asked for
        let leftover = framed.read_buffer().len();
        if leftover > 0 {
            return Err(ClientError::Decoding(ProtocolError::TrailingData {
                offset: payload.len(),
            }));
        }

        tracing::trace!(len = payload.len(), "Received payload from Kernel");
        Ok(payload)
    }

    /// Send a payload and wait for the response payload
    pub async fn round_trip(&mut self, payload: Bytes) -> Result<BytesMut, ClientError> {
        self.send(payload).await?;
        self.receive().await
    }

    /// Shut the socket down. Calling this more than once is a no-op.
    pub async fn close(&mut self) {
        if let Some(framed) = self.framed.take() {
            let mut stream = framed.into_inner();
            if let Err(e) = stream.shutdown().await {
                tracing::debug!("Error shutting down Kernel connection: {}", e);
            }
            tracing::debug!("Closed connection to Kernel at {}", self.address);
        }
    }
}

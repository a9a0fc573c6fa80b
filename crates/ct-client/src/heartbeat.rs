//! Periodic liveness reports

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;
use crate::kernel::SharedKernelClient;

/// Send a `heartbeat` every `interval` until `cancel` fires.
///
/// The first heartbeat goes out one interval after the call, since the
/// handshake has just reported a fresh status. Returns the number of
/// heartbeats acknowledged, or the first error; an in-flight heartbeat is
/// always allowed to finish before cancellation is observed.
pub async fn run(
    client: SharedKernelClient,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<u64, ClientError> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    let mut acknowledged = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(acknowledged, "Heartbeat loop stopped");
                return Ok(acknowledged);
            }
            _ = ticker.tick() => {
                let response = client.lock().await.heartbeat().await?;
                acknowledged += 1;
                tracing::trace!(acknowledged, "Heartbeat acknowledged: {}", response.message());
            }
        }
    }
}

/// Run the heartbeat loop on its own task
pub fn spawn(
    client: SharedKernelClient,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<Result<u64, ClientError>> {
    tokio::spawn(run(client, interval, cancel))
}

//! Kernel client agent
//!
//! Registers this service with the Kernel and keeps reporting its status
//! until interrupted. On any fatal error the reason is appended to the error
//! log and the process exits with status 2, leaving restarts to the Kernel.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ct_client::{heartbeat, KernelClient, FATAL_EXIT_CODE};
use ct_core::config::{self, ClientConfig};
use ct_core::error_log;
use ct_protocol::Framing;

#[derive(Parser)]
#[command(name = "ct-client")]
#[command(about = "Kernel client agent - registers a service and reports its status")]
#[command(version)]
struct Args {
    /// The service token
    #[arg(long, env = "CT_TOKEN")]
    token: Option<String>,

    /// The service port
    #[arg(long, env = "CT_SERVICE_PORT")]
    service_port: Option<u16>,

    /// The Kernel port
    #[arg(long, env = "CT_KERNEL_PORT")]
    kernel_port: Option<u16>,

    /// The Kernel host
    #[arg(long, env = "CT_KERNEL_HOST")]
    kernel_host: Option<String>,

    /// Payload framing on the Kernel connection (raw, length_prefixed)
    #[arg(long)]
    framing: Option<Framing>,

    /// Seconds between heartbeats
    #[arg(long)]
    heartbeat_interval: Option<u64>,

    /// File fatal errors are appended to
    #[arg(long)]
    error_log: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run in foreground, logging to stderr
    #[arg(short, long)]
    foreground: bool,

    /// Log level for --foreground output (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    /// Layer command-line values over the config file
    fn into_config(self) -> Result<ClientConfig> {
        let mut config = match self.config {
            Some(ref path) => config::load_config(path).map_err(|e| {
                anyhow::anyhow!("Failed to load config from {}: {}", path.display(), e)
            })?,
            None => ClientConfig::default(),
        };

        if let Some(token) = self.token {
            config.token = token;
        }
        if let Some(port) = self.service_port {
            config.service_port = port;
        }
        if let Some(port) = self.kernel_port {
            config.kernel_port = port;
        }
        if let Some(host) = self.kernel_host {
            config.kernel_host = host;
        }
        if let Some(framing) = self.framing {
            config.framing = framing;
        }
        if let Some(secs) = self.heartbeat_interval {
            config.heartbeat_interval = Duration::from_secs(secs);
        }
        if let Some(path) = self.error_log {
            config.error_log = path;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging. Detached runs stay silent: fatal errors only go to the error log.
    let console = args
        .foreground
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(console)
        .init();

    // The sink must be known even when the rest of the config is unusable
    let fallback_log = args
        .error_log
        .clone()
        .unwrap_or_else(|| PathBuf::from(error_log::DEFAULT_ERROR_LOG));

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => fail(&fallback_log, &e),
    };
    let error_log_path = config.error_log.clone();

    if let Err(e) = run(config).await {
        fail(&error_log_path, &e);
    }
}

async fn run(config: ClientConfig) -> Result<()> {
    let interval = config.heartbeat_interval;

    let mut client = KernelClient::new(config)?;
    client.connect().await?;

    let client = client.into_shared();
    let shutdown = CancellationToken::new();
    let mut heartbeats = heartbeat::spawn(client.clone(), interval, shutdown.clone());

    let outcome = tokio::select! {
        joined = &mut heartbeats => joined.map_err(heartbeat_panicked)?,
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|e| anyhow::anyhow!("Failed to listen for shutdown signal: {}", e))?;
            tracing::info!("Interrupted, shutting down");
            shutdown.cancel();
            // Let an in-flight heartbeat finish before closing the connection
            heartbeats.await.map_err(heartbeat_panicked)?
        }
    };
    client.lock().await.shutdown().await;

    let acknowledged = outcome?;
    tracing::info!(acknowledged, "Stopped");
    Ok(())
}

fn heartbeat_panicked(e: tokio::task::JoinError) -> anyhow::Error {
    anyhow::anyhow!("Heartbeat task failed: {}", e)
}

/// Record a fatal error and exit
///
/// Error messages already embed their causes, so only the top level is printed.
fn fail(error_log_path: &Path, error: &anyhow::Error) -> ! {
    tracing::error!("{}", error);
    error_log::record(error_log_path, error);
    std::process::exit(FATAL_EXIT_CODE);
}

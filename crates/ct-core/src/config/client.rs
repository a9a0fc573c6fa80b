//! Client agent configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use ct_protocol::Framing;

use super::serde_utils::duration_secs;
use crate::error::ConfigError;
use crate::error_log::DEFAULT_ERROR_LOG;

/// Value a required setting holds until it is given.
pub const PLACEHOLDER: &str = "0";

/// Configuration for the client agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Token presented to the Kernel as the emitter of every command
    pub token: String,

    /// Port this service listens on. Not used by the Kernel protocol,
    /// but the Kernel launches services with it and it must be present.
    pub service_port: u16,

    /// Port the Kernel listens on
    pub kernel_port: u16,

    /// Host the Kernel listens on
    pub kernel_host: String,

    /// How payloads are delimited on the Kernel connection
    pub framing: Framing,

    /// Deadline for establishing the TCP connection (0 disables)
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Deadline for each write and each read of an exchange (0 disables)
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// Interval between heartbeat commands
    #[serde(with = "duration_secs")]
    pub heartbeat_interval: Duration,

    /// File fatal errors are appended to
    pub error_log: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: PLACEHOLDER.to_string(),
            service_port: 0,
            kernel_port: 0,
            kernel_host: "127.0.0.1".to_string(),
            framing: Framing::Raw,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(30),
            error_log: PathBuf::from(DEFAULT_ERROR_LOG),
        }
    }
}

impl ClientConfig {
    /// Check that every required value was given
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() || self.token == PLACEHOLDER {
            return Err(ConfigError::MissingField(
                "token: the service token must be given".to_string(),
            ));
        }
        if self.service_port == 0 {
            return Err(ConfigError::MissingField(
                "service_port: the service port must be given".to_string(),
            ));
        }
        if self.kernel_port == 0 {
            return Err(ConfigError::MissingField(
                "kernel_port: the Kernel port must be given".to_string(),
            ));
        }
        if self.kernel_host.trim().is_empty() {
            return Err(ConfigError::Invalid("kernel_host must not be empty".to_string()));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "heartbeat_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Address of the Kernel (host:port)
    pub fn kernel_address(&self) -> String {
        format!("{}:{}", self.kernel_host, self.kernel_port)
    }

    /// Connect deadline, if enabled
    pub fn connect_deadline(&self) -> Option<Duration> {
        non_zero(self.connect_timeout)
    }

    /// Per-read/per-write deadline, if enabled
    pub fn request_deadline(&self) -> Option<Duration> {
        non_zero(self.request_timeout)
    }
}

fn non_zero(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}

//! Configuration management for the Kernel client agent
//!
//! Values come from, in increasing precedence: [`ClientConfig::default`], an
//! optional TOML file, then environment variables and command-line flags
//! applied by the binary. [`ClientConfig::validate`] runs before any network
//! activity.

mod client;
pub mod serde_utils;

pub use client::{ClientConfig, PLACEHOLDER};

use crate::error::ConfigError;
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_written_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("client.toml");

        let mut config = ClientConfig::default();
        config.token = "abc123".to_string();
        config.kernel_port = 7070;
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded: ClientConfig = load_config(&path).unwrap();
        assert_eq!(loaded.token, "abc123");
        assert_eq!(loaded.kernel_port, 7070);
        assert_eq!(loaded.connect_timeout, config.connect_timeout);
        assert_eq!(loaded.framing, config.framing);
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = load_config::<ClientConfig>(&temp.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_unreadable_path() {
        let temp = TempDir::new().unwrap();
        // Exists, but is a directory
        let err = load_config::<ClientConfig>(temp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_malformed_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("client.toml");
        std::fs::write(&path, "kernel_port = \"not a number\"").unwrap();

        let err = load_config::<ClientConfig>(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}

//! ct-core: Configuration and shared utilities for the Kernel client agent
//!
//! This crate provides the agent configuration, its validation errors, the
//! fatal error log and small time helpers used by the client.

pub mod config;
pub mod error;
pub mod error_log;
pub mod time;

pub use config::ClientConfig;
pub use error::ConfigError;

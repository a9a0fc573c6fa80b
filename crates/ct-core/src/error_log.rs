//! Append-only log of fatal errors
//!
//! The agent runs unattended under the Kernel's supervision, so the reason it
//! died is written to a local file rather than the console. Each entry is one
//! line: an RFC 3339 timestamp followed by the error.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;

/// Default error log file, relative to the working directory
pub const DEFAULT_ERROR_LOG: &str = "errors.txt";

/// Append `error` to the log at `path`
///
/// Creates the file (and parent directories) if needed.
pub fn append(path: &Path, error: &dyn fmt::Display) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o660);
    }

    let mut file = options.open(path)?;
    writeln!(file, "{} {}", Utc::now().to_rfc3339(), error)?;
    Ok(())
}

/// Append `error` to the log, reporting (not propagating) sink failures
pub fn record(path: &Path, error: &dyn fmt::Display) {
    if let Err(e) = append(path, error) {
        tracing::warn!(path = %path.display(), "Failed to write error log: {}", e);
    }
}

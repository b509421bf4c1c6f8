//! Error types for dh-ddns-updater.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dh-ddns-updater.
pub type Result<T> = std::result::Result<T, DdnsError>;

/// DDNS error types.
#[derive(Error, Debug)]
pub enum DdnsError {
    /// Configuration error. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The state file exists but could not be parsed. Fatal at startup.
    #[error("State file {} is corrupt: {message}", .path.display())]
    StateCorrupt { path: PathBuf, message: String },

    /// Public IP lookup failed (transport error or unusable body).
    #[error("IP resolution failed: {0}")]
    Resolution(String),

    /// Public IP service answered with a non-success status.
    #[error("IP resolution failed: HTTP {0}")]
    ResolutionStatus(u16),

    /// DNS provider call failed.
    #[error("Provider error ({command}): {message}")]
    Provider { command: String, message: String },

    /// One or more record updates failed during a pass.
    #[error("failed to update {0} records")]
    UpdatesFailed(usize),

    /// The run context was cancelled while work was in flight.
    #[error("operation cancelled")]
    Cancelled,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DdnsError {
    pub(crate) fn provider(command: &str, message: impl Into<String>) -> Self {
        DdnsError::Provider {
            command: command.to_string(),
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for DdnsError {
    fn from(e: toml::de::Error) -> Self {
        DdnsError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for DdnsError {
    fn from(e: serde_json::Error) -> Self {
        DdnsError::Serialization(e.to_string())
    }
}

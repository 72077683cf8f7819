//! Error types for the reconciliation agent

use std::path::PathBuf;

use fleetpack_client::ClientError;
use fleetpack_packet::PacketError;
use fleetpack_pkg::InstallError;
use thiserror::Error;

/// Errors raised while reconciling a device
#[derive(Error, Debug)]
pub enum AgentError {
    /// Talking to the server failed
    #[error("transport error: {0}")]
    Transport(#[from] ClientError),

    /// Bytes could not be decoded as a packet
    #[error("decode error: {0}")]
    Decode(#[from] PacketError),

    /// Install or uninstall failed part way
    #[error("install error: {0}")]
    Install(#[from] InstallError),

    /// Fetched bytes do not hash to what was asked for
    #[error("integrity error: expected {expected}, got {actual}")]
    Integrity {
        /// Requested hash
        expected: String,
        /// Hash of the bytes actually received
        actual: String,
    },

    /// Local packet cache could not be read or written
    #[error("packet cache error at {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A blocking task panicked or was cancelled
    #[error("background task failed: {0}")]
    Task(String),

    /// Settings are unusable
    #[error("configuration error: {0}")]
    Config(String),
}

impl AgentError {
    pub(crate) fn cache(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Cache {
            path: path.into(),
            source,
        }
    }
}

/// Result type for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

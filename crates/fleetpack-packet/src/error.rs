//! Error types for fleetpack-packet

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while encoding, decoding or building packets
#[derive(Error, Debug)]
pub enum PacketError {
    /// Filesystem or encoder I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive bytes could not be read as tar/xz
    #[error("malformed archive: {0}")]
    Malformed(String),

    /// A section expands past the decode limit
    #[error("archive section expands beyond {limit} bytes")]
    TooLarge {
        /// Limit that was exceeded
        limit: u64,
    },

    /// A mandatory archive entry is absent
    #[error("missing archive entry: {0}")]
    MissingEntry(&'static str),

    /// The control metadata record could not be parsed or written
    #[error("invalid control metadata: {0}")]
    InvalidControl(#[from] serde_yaml::Error),

    /// A payload path would escape the install root
    #[error("unsafe payload path: {0}")]
    UnsafePath(String),

    /// A payload entry is unusable
    #[error("invalid payload entry {path}: {reason}")]
    InvalidEntry {
        /// Entry path as found in the archive or directory
        path: String,
        /// What is wrong with it
        reason: String,
    },

    /// Scaffold target exists and has content
    #[error("target directory already exists and is not empty: {0}")]
    DirectoryNotEmpty(PathBuf),

    /// Path was expected to be a directory
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}

impl PacketError {
    /// Whether the error stems from malformed input bytes rather than the
    /// local environment
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            PacketError::Malformed(_)
                | PacketError::TooLarge { .. }
                | PacketError::MissingEntry(_)
                | PacketError::InvalidControl(_)
                | PacketError::UnsafePath(_)
                | PacketError::InvalidEntry { .. }
        )
    }

    pub(crate) fn malformed(err: impl std::fmt::Display) -> Self {
        PacketError::Malformed(err.to_string())
    }
}

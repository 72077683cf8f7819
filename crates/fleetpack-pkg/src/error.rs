//! Error types for fleetpack-pkg

use std::path::PathBuf;

use fleetpack_exec::ExecError;
use thiserror::Error;

use crate::types::ScriptPhase;

/// Errors that can occur while applying or removing a packet
#[derive(Error, Debug)]
pub enum InstallError {
    /// A lifecycle script exited non-zero
    #[error("{phase} script failed with status {status}")]
    Script {
        /// Which script
        phase: ScriptPhase,
        /// Exit status
        status: i32,
    },

    /// A lifecycle script could not be run
    #[error("{phase} script could not be run: {source}")]
    Exec {
        /// Which script
        phase: ScriptPhase,
        /// Underlying failure
        #[source]
        source: ExecError,
    },

    /// Filesystem operation failed
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being operated on
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Writing the entry would leave the install root
    #[error("refusing to write through {}: it resolves outside the install root", .0.display())]
    UnsafePath(PathBuf),

    /// A payload file or symlink collides with an existing directory
    #[error("cannot replace directory {} with a non-directory entry", .0.display())]
    DirectoryConflict(PathBuf),
}

impl InstallError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InstallError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether a lifecycle script is to blame
    #[must_use]
    pub fn is_script_error(&self) -> bool {
        matches!(self, InstallError::Script { .. } | InstallError::Exec { .. })
    }
}

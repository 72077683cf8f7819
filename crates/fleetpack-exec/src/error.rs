//! Error types for fleetpack-exec

use thiserror::Error;

/// Errors that prevent a script from running to completion
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Interpreter could not be started
    #[error("failed to spawn {shell}: {reason}")]
    SpawnError {
        /// Interpreter path
        shell: String,
        /// Underlying failure
        reason: String,
    },

    /// I/O error while waiting for the script
    #[error("I/O error: {0}")]
    IoError(String),
}

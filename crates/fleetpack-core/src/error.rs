//! Core error types for fleetpack-core

use thiserror::Error;

/// Errors that can occur in registry and resolution operations
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// No stored packet has this hash
    #[error("packet not found: {0}")]
    PacketNotFound(String),

    /// No packet variant of `name` is satisfied by the request labels
    #[error("no packet named {name} matches labels {{{labels}}}")]
    NoMatchingPacket {
        /// Requested packet name
        name: String,
        /// Request labels, formatted `k=v,...`
        labels: String,
    },

    /// Spec not found in registry
    #[error("spec not found: {0}")]
    SpecNotFound(String),

    /// Spec already exists in registry
    #[error("spec already exists: {0}")]
    SpecAlreadyExists(String),

    /// Spec is unusable as given
    #[error("invalid spec: {0}")]
    InvalidSpec(String),

    /// Uploaded bytes are not a valid packet
    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    /// Snapshot could not be read or written
    #[error("storage error: {0}")]
    Storage(String),

    /// Actor communication error
    #[error("actor communication error: {0}")]
    ActorError(String),
}

impl CoreError {
    /// Whether the error means "the thing asked for does not exist"
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::PacketNotFound(_)
                | CoreError::NoMatchingPacket { .. }
                | CoreError::SpecNotFound(_)
        )
    }

    /// Whether the caller sent something unusable
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            CoreError::SpecAlreadyExists(_) | CoreError::InvalidSpec(_) | CoreError::InvalidPacket(_)
        )
    }
}

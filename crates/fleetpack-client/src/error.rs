//! Error types for the fleetpack client

use thiserror::Error;

/// Errors that can occur when talking to the fleetpack server
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Base URL cannot have path segments appended
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// API returned an error status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from server
        message: String,
    },
}

impl ClientError {
    /// Whether the server answered 404
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status: 404, .. })
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

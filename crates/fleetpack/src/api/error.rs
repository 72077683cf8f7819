//! API error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fleetpack_core::CoreError;
use fleetpack_packet::PacketError;
use kameo::error::SendError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Error message
    pub message: String,
}

impl ApiError {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Wrapper for API errors with status codes
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: ApiError,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: ApiError::new("NOT_FOUND", message),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ApiError::new("BAD_REQUEST", message),
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: ApiError::new("UNAUTHORIZED", "missing or invalid bearer token"),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: ApiError::new("INTERNAL_ERROR", message),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        if err.is_not_found() {
            Self::not_found(err.to_string())
        } else if err.is_invalid_input() {
            Self::bad_request(err.to_string())
        } else {
            Self::internal(err.to_string())
        }
    }
}

impl From<PacketError> for AppError {
    fn from(err: PacketError) -> Self {
        if err.is_decode_error() {
            Self::bad_request(err.to_string())
        } else {
            Self::internal(err.to_string())
        }
    }
}

impl<M> From<SendError<M, CoreError>> for AppError {
    fn from(err: SendError<M, CoreError>) -> Self {
        match err {
            SendError::HandlerError(e) => e.into(),
            other => Self::internal(format!("registry unavailable: {other}")),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = %self.error.code, message = %self.error.message, "request failed");
        }
        (self.status, Json(self.error)).into_response()
    }
}

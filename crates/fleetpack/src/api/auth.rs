//! Bearer token check

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::api::error::AppError;
use crate::state::AppState;

/// Reject requests without the configured bearer token
///
/// Passes everything through when no token is configured.
///
/// # Errors
/// Returns `AppError::unauthorized` on a missing or wrong token
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.config.requires_token() {
        return Ok(next.run(request).await);
    }
    let expected = state.config.server.auth_token.as_deref().unwrap_or_default();

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if presented != Some(expected) {
        warn!(path = %request.uri().path(), "rejected request with bad token");
        return Err(AppError::unauthorized());
    }

    Ok(next.run(request).await)
}

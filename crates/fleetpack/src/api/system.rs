//! System endpoints

use std::sync::Arc;

use axum::{Json, extract::State};
use fleetpack_api::HealthResponse;
use fleetpack_core::GetStats;

use crate::api::error::AppError;
use crate::state::AppState;

/// Server health and registry counters
///
/// # Errors
/// Returns `AppError` if the registry does not answer
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Server is up", body = HealthResponse))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    let stats = state
        .registry
        .ask(GetStats)
        .await
        .map_err(|e| AppError::internal(format!("registry unavailable: {e}")))?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        packets: stats.packets,
        specs: stats.specs,
        started_at: state.started_at,
    }))
}

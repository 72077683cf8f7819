//! Spec API endpoints

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use fleetpack_api::Spec;
use fleetpack_core::{ComputeSpec, CreateSpec, DeleteSpec, GetSpec, ListSpecs, ReplaceSpec};

use crate::api::error::{ApiError, AppError};
use crate::api::parse_json;
use crate::state::AppState;

/// List all specs in creation order
///
/// # Errors
/// Returns `AppError` if registry communication fails
#[utoipa::path(
    get,
    path = "/spec/",
    tag = "specs",
    responses((status = 200, description = "All specs", body = Vec<Spec>))
)]
pub async fn list_specs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Spec>>, AppError> {
    let specs = state
        .registry
        .ask(ListSpecs)
        .await
        .map_err(|e| AppError::internal(format!("failed to list specs: {e}")))?;
    Ok(Json(specs))
}

/// Create a spec
///
/// # Errors
/// Returns `AppError` if the id is empty or already taken
#[utoipa::path(
    post,
    path = "/spec/",
    tag = "specs",
    request_body = Spec,
    responses(
        (status = 200, description = "Created spec", body = Spec),
        (status = 400, description = "Malformed, empty or duplicate id", body = ApiError)
    )
)]
pub async fn create_spec(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Spec>, AppError> {
    let spec: Spec = parse_json(&body)?;
    let created = state.registry.ask(CreateSpec { spec }).await?;
    Ok(Json(created))
}

/// Merge every spec whose target matches a label set
///
/// # Errors
/// Returns `AppError` if the body is not a label map
#[utoipa::path(
    post,
    path = "/spec/compute",
    tag = "specs",
    request_body = BTreeMap<String, String>,
    responses(
        (status = 200, description = "Merged spec", body = Spec),
        (status = 400, description = "Malformed label map", body = ApiError)
    )
)]
pub async fn compute_spec(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Spec>, AppError> {
    let labels: BTreeMap<String, String> = parse_json(&body)?;
    let merged = state.registry.ask(ComputeSpec { labels }).await?;
    Ok(Json(merged))
}

/// Get a spec by id
///
/// # Errors
/// Returns `AppError` if the id is unknown
#[utoipa::path(
    get,
    path = "/spec/{id}",
    tag = "specs",
    params(("id" = String, Path, description = "Spec id")),
    responses(
        (status = 200, description = "Spec", body = Spec),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
pub async fn get_spec(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Spec>, AppError> {
    let spec = state.registry.ask(GetSpec { id }).await?;
    Ok(Json(spec))
}

/// Replace a spec
///
/// The path id wins over any id in the body.
///
/// # Errors
/// Returns `AppError` if the id is unknown or the body malformed
#[utoipa::path(
    put,
    path = "/spec/{id}",
    tag = "specs",
    params(("id" = String, Path, description = "Spec id")),
    request_body = Spec,
    responses(
        (status = 200, description = "Replaced spec", body = Spec),
        (status = 400, description = "Malformed body", body = ApiError),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
pub async fn replace_spec(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Spec>, AppError> {
    let spec: Spec = parse_json(&body)?;
    let replaced = state.registry.ask(ReplaceSpec { id, spec }).await?;
    Ok(Json(replaced))
}

/// Delete a spec
///
/// # Errors
/// Returns `AppError` if the id is unknown
#[utoipa::path(
    delete,
    path = "/spec/{id}",
    tag = "specs",
    params(("id" = String, Path, description = "Spec id")),
    responses(
        (status = 200, description = "Deleted spec", body = Spec),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
pub async fn delete_spec(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Spec>, AppError> {
    let removed = state.registry.ask(DeleteSpec { id }).await?;
    Ok(Json(removed))
}

//! Packet API endpoints

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use fleetpack_api::{ControlInfo, DesiredState, PacketListing};
use fleetpack_core::{
    ComputeDesiredState, DeletePacket, GetPacketData, GetPacketInfo, ListPackets, SavePacket,
};
use fleetpack_packet::SealedPacket;
use tracing::info;

use crate::api::error::{ApiError, AppError};
use crate::api::parse_json;
use crate::state::AppState;

const PACKET_CONTENT_TYPE: &str = "application/octet-stream";

/// List every stored packet, grouped by name
///
/// # Errors
/// Returns `AppError` if registry communication fails
#[utoipa::path(
    get,
    path = "/packet/",
    tag = "packets",
    responses((status = 200, description = "Control infos grouped by packet name", body = BTreeMap<String, Vec<ControlInfo>>))
)]
pub async fn list_packets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PacketListing>, AppError> {
    let listing = state
        .registry
        .ask(ListPackets)
        .await
        .map_err(|e| AppError::internal(format!("failed to list packets: {e}")))?;
    Ok(Json(listing))
}

/// Upload an encoded packet
///
/// The bytes are decoded and re-encoded canonically before storage, so the
/// returned hash may differ from a hash of the uploaded bytes.
///
/// # Errors
/// Returns `AppError` if the bytes are not a packet or storage fails
#[utoipa::path(
    post,
    path = "/packet/",
    tag = "packets",
    request_body(content = Vec<u8>, content_type = "application/octet-stream", description = "Encoded .jpk archive"),
    responses(
        (status = 200, description = "Stored packet", body = ControlInfo),
        (status = 400, description = "Not a valid packet", body = ApiError)
    )
)]
pub async fn upload_packet(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ControlInfo>, AppError> {
    let size = body.len();
    let limit = state.config.server.max_unpacked_bytes;
    let packet = tokio::task::spawn_blocking(move || SealedPacket::from_bytes_limited(&body, limit))
        .await
        .map_err(|e| AppError::internal(format!("decode task failed: {e}")))??;

    let info = state.registry.ask(SavePacket { packet }).await?;
    info!(name = %info.name, hash = %info.hash, size, "packet uploaded");
    Ok(Json(info))
}

/// Resolve the desired state for a label set
///
/// # Errors
/// Returns `AppError` if the body is not a label map
#[utoipa::path(
    post,
    path = "/packet/compute",
    tag = "packets",
    request_body = BTreeMap<String, String>,
    responses(
        (status = 200, description = "Resolved desired state", body = DesiredState),
        (status = 400, description = "Malformed label map", body = ApiError)
    )
)]
pub async fn compute_desired_state(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<DesiredState>, AppError> {
    let labels: BTreeMap<String, String> = parse_json(&body)?;
    let desired = state.registry.ask(ComputeDesiredState { labels }).await?;
    Ok(Json(desired))
}

/// Delete a packet by hash
///
/// # Errors
/// Returns `AppError` if the hash is unknown
#[utoipa::path(
    delete,
    path = "/packet/{hash}",
    tag = "packets",
    params(("hash" = String, Path, description = "Packet hash")),
    responses(
        (status = 200, description = "Deleted packet", body = ControlInfo),
        (status = 404, description = "Unknown hash", body = ApiError)
    )
)]
pub async fn delete_packet(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Result<Json<ControlInfo>, AppError> {
    let info = state.registry.ask(DeletePacket { hash }).await?;
    Ok(Json(info))
}

/// Control info for a hash
///
/// # Errors
/// Returns `AppError` if the hash is unknown
#[utoipa::path(
    get,
    path = "/packet/{hash}/info",
    tag = "packets",
    params(("hash" = String, Path, description = "Packet hash")),
    responses(
        (status = 200, description = "Control info", body = ControlInfo),
        (status = 404, description = "Unknown hash", body = ApiError)
    )
)]
pub async fn packet_info(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Result<Json<ControlInfo>, AppError> {
    let info = state.registry.ask(GetPacketInfo { hash }).await?;
    Ok(Json(info))
}

/// Canonical packet bytes for a hash
///
/// # Errors
/// Returns `AppError` if the hash is unknown
#[utoipa::path(
    get,
    path = "/packet/{hash}/data",
    tag = "packets",
    params(("hash" = String, Path, description = "Packet hash")),
    responses(
        (status = 200, description = "Encoded .jpk archive", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 404, description = "Unknown hash", body = ApiError)
    )
)]
pub async fn packet_data(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let data = state.registry.ask(GetPacketData { hash }).await?;
    Ok(([(header::CONTENT_TYPE, PACKET_CONTENT_TYPE)], data))
}

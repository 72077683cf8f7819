//! API route handlers

use serde::de::DeserializeOwned;
use utoipa::OpenApi;

pub mod auth;
pub mod error;
pub mod packets;
pub mod specs;
pub mod system;

pub use error::{ApiError, AppError};

/// Parse a JSON body, answering 400 on any failure
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::bad_request(format!("invalid JSON body: {e}")))
}

/// OpenAPI document for every route
#[derive(OpenApi)]
#[openapi(
    info(title = "fleetpack", description = "Label-matched packet distribution"),
    paths(
        system::health,
        packets::list_packets,
        packets::upload_packet,
        packets::compute_desired_state,
        packets::delete_packet,
        packets::packet_info,
        packets::packet_data,
        specs::list_specs,
        specs::create_spec,
        specs::compute_spec,
        specs::get_spec,
        specs::replace_spec,
        specs::delete_spec,
    ),
    components(schemas(
        ApiError,
        fleetpack_api::ControlInfo,
        fleetpack_api::Scripts,
        fleetpack_api::Spec,
        fleetpack_api::App,
        fleetpack_api::DesiredState,
        fleetpack_api::DesiredApp,
        fleetpack_api::ResolutionError,
        fleetpack_api::HealthResponse,
    )),
    tags(
        (name = "packets", description = "Packet storage and resolution"),
        (name = "specs", description = "Deployment specs"),
        (name = "system", description = "Server status")
    )
)]
pub struct ApiDoc;

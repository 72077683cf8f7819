//! HTTP router configuration

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api::{ApiDoc, auth, packets, specs, system};
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.max_upload_bytes;

    let protected = Router::new()
        // Packet endpoints
        .route(
            "/packet/",
            get(packets::list_packets).post(packets::upload_packet),
        )
        .route("/packet/compute", post(packets::compute_desired_state))
        .route("/packet/{hash}", delete(packets::delete_packet))
        .route("/packet/{hash}/info", get(packets::packet_info))
        .route("/packet/{hash}/data", get(packets::packet_data))
        // Spec endpoints
        .route("/spec/", get(specs::list_specs).post(specs::create_spec))
        .route("/spec/compute", post(specs::compute_spec))
        .route(
            "/spec/{id}",
            get(specs::get_spec)
                .put(specs::replace_spec)
                .delete(specs::delete_spec),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_token,
        ));

    Router::new()
        // System endpoints
        .route("/health", get(system::health))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(protected)
        .layer(DefaultBodyLimit::max(body_limit))
        // State
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
}

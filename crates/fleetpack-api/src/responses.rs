//! Response types for the API

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::packet::ControlInfo;

/// Body of `GET /packet/`: control infos grouped by packet name
pub type PacketListing = BTreeMap<String, Vec<ControlInfo>>;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub packets: usize,
    pub specs: usize,
    pub started_at: DateTime<Utc>,
}

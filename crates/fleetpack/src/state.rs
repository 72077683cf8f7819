//! Application state shared across HTTP handlers

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleetpack_core::RegistryActor;
use kameo::actor::ActorRef;

use crate::config::Config;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Reference to the packet and spec registry
    pub registry: ActorRef<RegistryActor>,
    /// Application configuration
    pub config: Arc<Config>,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(registry: ActorRef<RegistryActor>, config: Config) -> Self {
        Self {
            registry,
            config: Arc::new(config),
            started_at: Utc::now(),
        }
    }
}

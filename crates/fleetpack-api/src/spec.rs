//! Deployment spec types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A declarative rule mapping a device label predicate to desired apps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Spec {
    /// Unique spec identifier
    #[serde(default)]
    pub id: String,
    /// Devices whose labels contain every pair here receive the apps
    #[serde(default)]
    pub target: BTreeMap<String, String>,
    /// Apps requested for matching devices
    #[serde(default)]
    pub apps: Vec<App>,
}

impl Spec {
    /// Create an empty spec
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Add a target label
    #[must_use]
    pub fn with_target(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.target.insert(key.into(), value.into());
        self
    }

    /// Add an app
    #[must_use]
    pub fn with_app(mut self, app: App) -> Self {
        self.apps.push(app);
        self
    }
}

/// A request for some variant of `name` matching at least `labels`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct App {
    /// Packet name
    pub name: String,
    /// Minimum labels the chosen variant is resolved against
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl App {
    /// Create an app request without labels
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Add a label
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

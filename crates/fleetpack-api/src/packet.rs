//! Packet metadata types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle scripts run around payload application and removal
///
/// An empty body means the script is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Scripts {
    /// Runs before the payload is extracted
    #[serde(default)]
    pub pre_install: String,
    /// Runs after the payload is extracted
    #[serde(default)]
    pub post_install: String,
    /// Runs before payload files are removed
    #[serde(default)]
    pub pre_remove: String,
    /// Runs after payload files are removed
    #[serde(default)]
    pub post_remove: String,
}

impl Scripts {
    /// Whether all four scripts are empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pre_install.is_empty()
            && self.post_install.is_empty()
            && self.pre_remove.is_empty()
            && self.post_remove.is_empty()
    }
}

/// Identifying metadata of one packet variant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ControlInfo {
    /// Logical application name
    pub name: String,
    /// Matching predicate: every pair must be present in a request
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Content hash of the encoded packet (empty when not yet computed)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hash: String,
    /// Lifecycle scripts
    #[serde(default, skip_serializing_if = "Scripts::is_empty")]
    pub scripts: Scripts,
}

impl ControlInfo {
    /// Create control info without scripts or hash
    pub fn new(name: impl Into<String>, labels: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            labels,
            hash: String::new(),
            scripts: Scripts::default(),
        }
    }

    /// Attach a content hash
    #[must_use]
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = hash.into();
        self
    }
}

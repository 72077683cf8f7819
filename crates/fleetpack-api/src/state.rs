//! Desired state computed by the server for a labelled device

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The concrete install list for a device
///
/// `errors` lists apps that could not be resolved; `apps` then holds the
/// partial result for everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DesiredState {
    /// Resolved apps
    #[serde(default)]
    pub apps: Vec<DesiredApp>,
    /// Per-app resolution failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ResolutionError>,
}

impl DesiredState {
    /// Set of hashes that should be installed
    #[must_use]
    pub fn hashes(&self) -> BTreeSet<&str> {
        self.apps.iter().map(|a| a.hash.as_str()).collect()
    }

    /// Whether any app failed to resolve
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Names of apps that failed to resolve
    #[must_use]
    pub fn unresolved_names(&self) -> BTreeSet<&str> {
        self.errors.iter().map(|e| e.app.as_str()).collect()
    }
}

/// One resolved app
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DesiredApp {
    /// Packet name
    pub name: String,
    /// Labels of the chosen packet variant
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Content hash of the chosen packet
    pub hash: String,
}

/// An app that could not be resolved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResolutionError {
    /// Requested packet name
    pub app: String,
    /// Label set the lookup was made with
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Why resolution failed
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(name: &str, hash: &str) -> DesiredApp {
        DesiredApp {
            name: name.to_string(),
            labels: BTreeMap::new(),
            hash: hash.to_string(),
        }
    }

    #[test]
    fn test_hashes_and_partial() {
        let state = DesiredState {
            apps: vec![app("a", "h1"), app("b", "h2")],
            errors: vec![ResolutionError {
                app: "c".to_string(),
                labels: BTreeMap::new(),
                message: "no packet found".to_string(),
            }],
        };

        assert!(state.is_partial());
        assert_eq!(state.hashes().into_iter().collect::<Vec<_>>(), vec!["h1", "h2"]);
        assert!(state.unresolved_names().contains("c"));
    }

    #[test]
    fn test_errors_omitted_when_empty() {
        let state = DesiredState {
            apps: vec![app("a", "h1")],
            errors: vec![],
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("errors"));

        let back: DesiredState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}

//! Common types for installation

use std::fmt;

use serde::{Deserialize, Serialize};

/// Point in the packet lifecycle at which a script runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptPhase {
    PreInstall,
    PostInstall,
    PreRemove,
    PostRemove,
}

impl fmt::Display for ScriptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptPhase::PreInstall => write!(f, "pre-install"),
            ScriptPhase::PostInstall => write!(f, "post-install"),
            ScriptPhase::PreRemove => write!(f, "pre-remove"),
            ScriptPhase::PostRemove => write!(f, "post-remove"),
        }
    }
}

/// Summary of an install or uninstall run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    /// Regular files written or removed
    pub files: usize,
    /// Directories created (always 0 on uninstall)
    pub directories: usize,
    /// Symlinks created or removed
    pub symlinks: usize,
    /// Scripts that were run, in order
    pub scripts_run: Vec<ScriptPhase>,
}

impl InstallReport {
    /// Total filesystem entries touched
    #[must_use]
    pub fn entries(&self) -> usize {
        self.files + self.directories + self.symlinks
    }
}

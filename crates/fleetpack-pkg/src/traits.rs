//! Installer trait

use std::path::Path;

use async_trait::async_trait;
use fleetpack_packet::Packet;

use crate::error::InstallError;
use crate::types::InstallReport;

/// Applies and removes packets against a filesystem root
///
/// Neither operation is transactional: on error, whatever was already applied
/// stays applied and the caller should treat the root's state as unknown.
#[async_trait]
pub trait Installer: Send + Sync {
    /// Run pre-install, extract the payload under `root`, run post-install
    async fn install(&self, packet: &Packet, root: &Path) -> Result<InstallReport, InstallError>;

    /// Run pre-remove, delete the payload's non-directory entries, run
    /// post-remove
    async fn uninstall(&self, packet: &Packet, root: &Path)
    -> Result<InstallReport, InstallError>;
}

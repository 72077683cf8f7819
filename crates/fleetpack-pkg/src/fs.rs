//! Filesystem installer

use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use fleetpack_exec::ScriptExecutor;
use fleetpack_packet::{EntryKind, Packet, PayloadEntry};
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::error::InstallError;
use crate::traits::Installer;
use crate::types::{InstallReport, ScriptPhase};

const ROOT_MODE: u32 = 0o755;

/// Installer that writes payloads straight to the local filesystem
pub struct FsInstaller {
    executor: Arc<dyn ScriptExecutor>,
}

impl FsInstaller {
    /// Create an installer running scripts through `executor`
    pub fn new(executor: Arc<dyn ScriptExecutor>) -> Self {
        Self { executor }
    }

    async fn run_script(
        &self,
        phase: ScriptPhase,
        script: &str,
        report: &mut InstallReport,
    ) -> Result<(), InstallError> {
        if script.is_empty() {
            return Ok(());
        }

        debug!(%phase, executor = self.executor.executor_type(), "running lifecycle script");
        let result = self
            .executor
            .run(script)
            .await
            .map_err(|source| InstallError::Exec { phase, source })?;
        report.scripts_run.push(phase);

        if result.success() {
            Ok(())
        } else {
            Err(InstallError::Script {
                phase,
                status: result.status,
            })
        }
    }

    async fn apply_entry(
        &self,
        root: &Path,
        entry: &PayloadEntry,
        report: &mut InstallReport,
    ) -> Result<(), InstallError> {
        ensure_inside_root(root, &entry.path).await?;
        let target = root.join(&entry.path);

        match &entry.kind {
            EntryKind::Directory => {
                if is_non_directory(&target).await? {
                    remove_entry(&target).await?;
                }
                fs::create_dir_all(&target)
                    .await
                    .map_err(|e| InstallError::io(&target, e))?;
                set_mode(&target, entry.mode).await?;
                report.directories += 1;
            }
            EntryKind::File(contents) => {
                prepare_slot(&target).await?;
                fs::write(&target, contents)
                    .await
                    .map_err(|e| InstallError::io(&target, e))?;
                set_mode(&target, entry.mode).await?;
                report.files += 1;
            }
            EntryKind::Symlink(link_target) => {
                prepare_slot(&target).await?;
                fs::symlink(link_target, &target)
                    .await
                    .map_err(|e| InstallError::io(&target, e))?;
                report.symlinks += 1;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Installer for FsInstaller {
    #[instrument(skip(self, packet), fields(name = %packet.name, root = %root.display()))]
    async fn install(&self, packet: &Packet, root: &Path) -> Result<InstallReport, InstallError> {
        let mut report = InstallReport::default();

        if fs::metadata(root).await.is_err() {
            fs::create_dir_all(root)
                .await
                .map_err(|e| InstallError::io(root, e))?;
            set_mode(root, ROOT_MODE).await?;
        }

        self.run_script(ScriptPhase::PreInstall, &packet.scripts.pre_install, &mut report)
            .await?;

        for entry in packet.payload.entries() {
            self.apply_entry(root, entry, &mut report).await?;
        }

        self.run_script(ScriptPhase::PostInstall, &packet.scripts.post_install, &mut report)
            .await?;

        info!(entries = report.entries(), "installed packet");
        Ok(report)
    }

    #[instrument(skip(self, packet), fields(name = %packet.name, root = %root.display()))]
    async fn uninstall(
        &self,
        packet: &Packet,
        root: &Path,
    ) -> Result<InstallReport, InstallError> {
        let mut report = InstallReport::default();

        self.run_script(ScriptPhase::PreRemove, &packet.scripts.pre_remove, &mut report)
            .await?;

        for entry in packet.payload.entries().iter().rev() {
            if entry.is_directory() {
                continue;
            }
            ensure_inside_root(root, &entry.path).await?;
            let target = root.join(&entry.path);
            match fs::remove_file(&target).await {
                Ok(()) => match entry.kind {
                    EntryKind::Symlink(_) => report.symlinks += 1,
                    _ => report.files += 1,
                },
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %target.display(), "already removed");
                }
                Err(e) => return Err(InstallError::io(&target, e)),
            }
        }

        self.run_script(ScriptPhase::PostRemove, &packet.scripts.post_remove, &mut report)
            .await?;

        info!(entries = report.entries(), "uninstalled packet");
        Ok(report)
    }
}

/// Refuse entries whose parent resolves outside the root
///
/// Symlinked directories are followed as long as they stay inside the root,
/// so merged-usr layouts (`bin -> usr/bin`) and packet-provided links work.
/// A dangling link on the way is refused since its target cannot be checked.
async fn ensure_inside_root(root: &Path, relative: &Path) -> Result<(), InstallError> {
    let Some(parent) = relative.parent() else {
        return Ok(());
    };
    let canonical_root = match fs::canonicalize(root).await {
        Ok(path) => path,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(InstallError::io(root, e)),
    };

    for ancestor in parent.ancestors() {
        let candidate = root.join(ancestor);
        match fs::symlink_metadata(&candidate).await {
            Ok(_) => {
                let resolved = fs::canonicalize(&candidate)
                    .await
                    .map_err(|_| InstallError::UnsafePath(candidate.clone()))?;
                if resolved.starts_with(&canonical_root) {
                    return Ok(());
                }
                return Err(InstallError::UnsafePath(candidate));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(InstallError::io(&candidate, e)),
        }
    }
    Ok(())
}

async fn is_non_directory(path: &Path) -> Result<bool, InstallError> {
    match fs::symlink_metadata(path).await {
        Ok(meta) => Ok(!meta.file_type().is_dir()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(InstallError::io(path, e)),
    }
}

/// Make room for a file or symlink: create parents and unlink whatever
/// non-directory entry is there, so writes never follow an old symlink
async fn prepare_slot(path: &Path) -> Result<(), InstallError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| InstallError::io(parent, e))?;
    }
    match fs::symlink_metadata(path).await {
        Ok(meta) if meta.file_type().is_dir() => {
            Err(InstallError::DirectoryConflict(path.to_path_buf()))
        }
        Ok(_) => remove_entry(path).await,
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(InstallError::io(path, e)),
    }
}

async fn remove_entry(path: &Path) -> Result<(), InstallError> {
    fs::remove_file(path)
        .await
        .map_err(|e| InstallError::io(path, e))
}

async fn set_mode(path: &Path, mode: u32) -> Result<(), InstallError> {
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| InstallError::io(path, e))
}

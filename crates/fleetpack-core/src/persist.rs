//! On-disk registry snapshot
//!
//! ```text
//! <data_dir>/
//!   index.json          packet order + specs
//!   packets/<hash>.jpk  canonical packet bytes
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fleetpack_api::Spec;
use fleetpack_packet::{SealedPacket, is_valid_hash};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::CoreError;

const INDEX_FILE: &str = "index.json";
const PACKET_DIR: &str = "packets";
const PACKET_EXT: &str = "jpk";

/// Contents of `index.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotIndex {
    /// Packet hashes in registry order
    #[serde(default)]
    pub packets: Vec<String>,
    /// Specs in registry order
    #[serde(default)]
    pub specs: Vec<Spec>,
}

/// Everything recovered from a snapshot
#[derive(Debug, Default)]
pub struct Snapshot {
    pub packets: Vec<SealedPacket>,
    pub specs: Vec<Spec>,
}

/// Reads and writes the snapshot under one directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn packet_path(&self, hash: &str) -> PathBuf {
        self.root
            .join(PACKET_DIR)
            .join(format!("{hash}.{PACKET_EXT}"))
    }

    /// Load the snapshot, creating an empty layout if none exists
    ///
    /// Packet files that are missing, undecodable or whose content no longer
    /// matches their name are skipped with a warning.
    ///
    /// # Errors
    /// Returns `CoreError::Storage` if the directory cannot be created or the
    /// index is unreadable
    pub async fn load(&self) -> Result<Snapshot, CoreError> {
        fs::create_dir_all(self.root.join(PACKET_DIR))
            .await
            .map_err(|e| storage_error(&self.root, e))?;

        let index_path = self.root.join(INDEX_FILE);
        let index: SnapshotIndex = match fs::read(&index_path).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .map_err(|e| CoreError::Storage(format!("{}: {e}", index_path.display())))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %index_path.display(), "no snapshot index, starting empty");
                SnapshotIndex::default()
            }
            Err(e) => return Err(storage_error(&index_path, e)),
        };

        let mut snapshot = Snapshot {
            packets: Vec::with_capacity(index.packets.len()),
            specs: index.specs,
        };

        for hash in &index.packets {
            if !is_valid_hash(hash) {
                warn!(hash = %hash, "skipping malformed hash in snapshot index");
                continue;
            }
            let path = self.packet_path(hash);
            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable packet");
                    continue;
                }
            };
            match SealedPacket::from_bytes(&bytes) {
                Ok(sealed) if sealed.hash() == hash => snapshot.packets.push(sealed),
                Ok(sealed) => {
                    warn!(
                        expected = %hash,
                        actual = %sealed.hash(),
                        "skipping packet whose content does not match its hash"
                    );
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping undecodable packet");
                }
            }
        }

        info!(
            root = %self.root.display(),
            packets = snapshot.packets.len(),
            specs = snapshot.specs.len(),
            "loaded registry snapshot"
        );
        Ok(snapshot)
    }

    /// Store packet bytes under their hash
    ///
    /// # Errors
    /// Returns `CoreError::Storage` on write failure
    pub async fn write_packet(&self, sealed: &SealedPacket) -> Result<(), CoreError> {
        let path = self.packet_path(sealed.hash());
        write_atomic(&path, sealed.bytes()).await
    }

    /// Remove a stored packet; a missing file is not an error
    ///
    /// # Errors
    /// Returns `CoreError::Storage` on any other failure
    pub async fn remove_packet(&self, hash: &str) -> Result<(), CoreError> {
        let path = self.packet_path(hash);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(&path, e)),
        }
    }

    /// Replace the index
    ///
    /// # Errors
    /// Returns `CoreError::Storage` on serialization or write failure
    pub async fn write_index(&self, index: &SnapshotIndex) -> Result<(), CoreError> {
        let raw = serde_json::to_vec_pretty(index)
            .map_err(|e| CoreError::Storage(format!("serializing index: {e}")))?;
        write_atomic(&self.root.join(INDEX_FILE), &raw).await
    }
}

/// Write to a sibling temp file and rename over the target
async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CoreError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, data)
        .await
        .map_err(|e| storage_error(&tmp, e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| storage_error(path, e))
}

fn storage_error(path: &Path, err: std::io::Error) -> CoreError {
    CoreError::Storage(format!("{}: {err}", path.display()))
}

//! Local cache of installed packets
//!
//! Every packet the agent has installed is kept as `<hash>.jpk` in one
//! directory. The set of cached hashes is the agent's record of what is
//! currently installed under its root.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fleetpack_packet::{Packet, is_valid_hash};
use tokio::fs;
use tracing::debug;

use crate::error::{AgentError, Result};

const PACKET_EXT: &str = "jpk";

/// Directory of `<hash>.jpk` files
#[derive(Debug, Clone)]
pub struct PacketCache {
    dir: PathBuf,
}

impl PacketCache {
    /// Open the cache, creating the directory if needed
    ///
    /// # Errors
    /// Returns `AgentError::Cache` if the directory cannot be created
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| AgentError::cache(&dir, e))?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.{PACKET_EXT}"))
    }

    /// Hashes of every cached packet
    ///
    /// Files that are not named `<hash>.jpk` are ignored.
    ///
    /// # Errors
    /// Returns `AgentError::Cache` if the directory cannot be listed
    pub async fn hashes(&self) -> Result<BTreeSet<String>> {
        let mut hashes = BTreeSet::new();
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| AgentError::cache(&self.dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AgentError::cache(&self.dir, e))?
        {
            let path = entry.path();
            let is_packet = path.extension().is_some_and(|ext| ext == PACKET_EXT);
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if is_packet && is_valid_hash(stem) => {
                    hashes.insert(stem.to_string());
                }
                _ => debug!(path = %path.display(), "ignoring foreign file in packet cache"),
            }
        }

        Ok(hashes)
    }

    /// Whether a packet with this hash is cached
    pub async fn contains(&self, hash: &str) -> bool {
        fs::try_exists(self.path_for(hash)).await.unwrap_or(false)
    }

    /// Decode a cached packet
    ///
    /// # Errors
    /// Returns `AgentError::Cache` if the file cannot be read and
    /// `AgentError::Decode` if it is not a packet
    pub async fn load(&self, hash: &str) -> Result<Packet> {
        let path = self.path_for(hash);
        let bytes = fs::read(&path)
            .await
            .map_err(|e| AgentError::cache(&path, e))?;
        decode(bytes).await
    }

    /// Store raw packet bytes under their hash
    ///
    /// # Errors
    /// Returns `AgentError::Cache` on write failure
    pub async fn store(&self, hash: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(hash);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)
            .await
            .map_err(|e| AgentError::cache(&tmp, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| AgentError::cache(&path, e))
    }

    /// Drop a cached packet; a missing file is not an error
    ///
    /// # Errors
    /// Returns `AgentError::Cache` on any other failure
    pub async fn remove(&self, hash: &str) -> Result<()> {
        let path = self.path_for(hash);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AgentError::cache(&path, e)),
        }
    }
}

/// Decode packet bytes off the async runtime
pub(crate) async fn decode(bytes: Vec<u8>) -> Result<Packet> {
    tokio::task::spawn_blocking(move || Packet::decode(&bytes))
        .await
        .map_err(|e| AgentError::Task(e.to_string()))?
        .map_err(AgentError::from)
}

#[cfg(test)]
mod tests {
    use fleetpack_api::Labels;
    use fleetpack_packet::SealedPacket;

    use super::*;

    #[tokio::test]
    async fn test_store_load_remove() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PacketCache::open(dir.path().join("packets")).await.unwrap();
        let sealed = SealedPacket::seal(Packet::new("demo", Labels::new())).unwrap();

        assert!(!cache.contains(sealed.hash()).await);
        cache.store(sealed.hash(), sealed.bytes()).await.unwrap();
        assert!(cache.contains(sealed.hash()).await);

        let loaded = cache.load(sealed.hash()).await.unwrap();
        assert_eq!(&loaded, sealed.packet());

        cache.remove(sealed.hash()).await.unwrap();
        cache.remove(sealed.hash()).await.unwrap();
        assert!(cache.hashes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hashes_ignore_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PacketCache::open(dir.path()).await.unwrap();
        let hash = "0123456789abcdef0123456789abcdef";

        std::fs::write(dir.path().join(format!("{hash}.jpk")), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("short.jpk"), b"x").unwrap();

        let hashes = cache.hashes().await.unwrap();
        assert_eq!(hashes.into_iter().collect::<Vec<_>>(), vec![hash.to_string()]);
    }
}

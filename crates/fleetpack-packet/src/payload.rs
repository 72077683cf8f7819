//! The data section: the file tree applied under the install root

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};

use tar::EntryType;
use tracing::warn;
use walkdir::WalkDir;

use crate::archive;
use crate::error::PacketError;

const SYMLINK_MODE: u32 = 0o777;

/// What a payload entry materializes as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File(Vec<u8>),
    Symlink(PathBuf),
}

/// One entry of the payload tree; `path` is relative to the install root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEntry {
    pub path: PathBuf,
    pub mode: u32,
    pub kind: EntryKind,
}

impl PayloadEntry {
    pub fn directory(path: impl Into<PathBuf>, mode: u32) -> Self {
        Self {
            path: path.into(),
            mode,
            kind: EntryKind::Directory,
        }
    }

    pub fn file(path: impl Into<PathBuf>, mode: u32, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            mode,
            kind: EntryKind::File(contents.into()),
        }
    }

    pub fn symlink(path: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mode: SYMLINK_MODE,
            kind: EntryKind::Symlink(target.into()),
        }
    }

    #[must_use]
    pub fn is_directory(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }
}

/// Ordered payload tree
///
/// Parents always precede their children, so entries can be applied front to
/// back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    entries: Vec<PayloadEntry>,
}

impl Payload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, normalizing its path
    ///
    /// # Errors
    /// Returns `PacketError::UnsafePath` if the path climbs out of the root
    pub fn push(&mut self, mut entry: PayloadEntry) -> Result<(), PacketError> {
        if let Some(path) = normalize(&entry.path)? {
            entry.path = path;
            self.entries.push(entry);
        }
        Ok(())
    }

    #[must_use]
    pub fn entries(&self) -> &[PayloadEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Capture a directory tree
    ///
    /// Entries are visited in file-name order, so the same tree always
    /// yields the same payload. Sockets, FIFOs and devices are skipped.
    ///
    /// # Errors
    /// Returns `PacketError::NotADirectory` if `root` is not a directory, or
    /// an I/O error if any entry cannot be read
    pub fn from_directory(root: &Path) -> Result<Self, PacketError> {
        if !root.is_dir() {
            return Err(PacketError::NotADirectory(root.to_path_buf()));
        }

        let mut payload = Payload::new();
        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| PacketError::InvalidEntry {
                    path: entry.path().display().to_string(),
                    reason: e.to_string(),
                })?
                .to_path_buf();

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                let target = fs::read_link(entry.path())?;
                payload.push(PayloadEntry::symlink(relative, target))?;
                continue;
            }

            let metadata = entry.metadata().map_err(std::io::Error::from)?;
            let mode = metadata.permissions().mode() & 0o7777;

            if file_type.is_dir() {
                payload.push(PayloadEntry::directory(relative, mode))?;
            } else if file_type.is_file() {
                let contents = fs::read(entry.path())?;
                payload.push(PayloadEntry::file(relative, mode, contents))?;
            } else {
                warn!(path = %entry.path().display(), "skipping special file");
            }
        }

        Ok(payload)
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let mut builder = tar::Builder::new(Vec::new());
        for entry in &self.entries {
            match &entry.kind {
                EntryKind::Directory => {
                    let mut header = archive::canonical_header(EntryType::Directory, entry.mode, 0);
                    builder.append_data(&mut header, &entry.path, std::io::empty())?;
                }
                EntryKind::File(contents) => {
                    let mut header = archive::canonical_header(
                        EntryType::Regular,
                        entry.mode,
                        contents.len() as u64,
                    );
                    builder.append_data(&mut header, &entry.path, contents.as_slice())?;
                }
                EntryKind::Symlink(target) => {
                    let mut header = archive::canonical_header(EntryType::Symlink, entry.mode, 0);
                    builder.append_link(&mut header, &entry.path, target)?;
                }
            }
        }
        let tar_bytes = builder.into_inner()?;
        archive::compress(&tar_bytes)
    }

    pub(crate) fn decode(compressed: &[u8], limit: u64) -> Result<Self, PacketError> {
        let tar_bytes = archive::decompress(compressed, limit)?;
        let mut tar = tar::Archive::new(tar_bytes.as_slice());
        let mut payload = Payload::new();

        for entry in tar.entries().map_err(PacketError::malformed)? {
            let mut entry = entry.map_err(PacketError::malformed)?;
            let path = entry.path().map_err(PacketError::malformed)?.into_owned();
            let mode = entry.header().mode().map_err(PacketError::malformed)? & 0o7777;
            let entry_type = entry.header().entry_type();

            let kind = match entry_type {
                EntryType::Directory => EntryKind::Directory,
                EntryType::Regular | EntryType::Continuous => {
                    EntryKind::File(archive::read_entry(&mut entry)?)
                }
                EntryType::Symlink => {
                    let target = entry
                        .link_name()
                        .map_err(PacketError::malformed)?
                        .ok_or_else(|| PacketError::InvalidEntry {
                            path: path.display().to_string(),
                            reason: "symlink without target".to_string(),
                        })?
                        .into_owned();
                    EntryKind::Symlink(target)
                }
                other => {
                    warn!(path = %path.display(), entry_type = ?other, "skipping unsupported payload entry");
                    continue;
                }
            };

            payload.push(PayloadEntry { path, mode, kind })?;
        }

        Ok(payload)
    }
}

/// Strip root and `.` components; `None` means the path names the root itself
fn normalize(path: &Path) -> Result<Option<PathBuf>, PacketError> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(PacketError::UnsafePath(path.display().to_string()));
            }
        }
    }
    Ok((!clean.as_os_str().is_empty()).then_some(clean))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("./etc/app.conf")).unwrap(),
            Some(PathBuf::from("etc/app.conf"))
        );
        assert_eq!(
            normalize(Path::new("/usr/bin/app")).unwrap(),
            Some(PathBuf::from("usr/bin/app"))
        );
        assert_eq!(normalize(Path::new("./")).unwrap(), None);
        assert!(matches!(
            normalize(Path::new("etc/../../shadow")),
            Err(PacketError::UnsafePath(_))
        ));
    }

    #[test]
    fn test_push_rejects_parent_dir() {
        let mut payload = Payload::new();
        let err = payload
            .push(PayloadEntry::file("../escape", 0o644, b"x".to_vec()))
            .unwrap_err();
        assert!(matches!(err, PacketError::UnsafePath(_)));
        assert!(payload.is_empty());
    }

    #[test]
    fn test_encode_decode_keeps_kinds_and_modes() {
        let mut payload = Payload::new();
        payload.push(PayloadEntry::directory("opt/app", 0o750)).unwrap();
        payload
            .push(PayloadEntry::file("opt/app/run.sh", 0o755, b"#!/bin/sh\n".to_vec()))
            .unwrap();
        payload
            .push(PayloadEntry::symlink("opt/app/current", "run.sh"))
            .unwrap();

        let decoded = Payload::decode(&payload.encode().unwrap(), 1 << 20).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_from_directory_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/z.txt"), "z").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let payload = Payload::from_directory(dir.path()).unwrap();
        let paths: Vec<_> = payload.entries().iter().map(|e| e.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("a.txt"),
                PathBuf::from("b"),
                PathBuf::from("b/z.txt")
            ]
        );
    }
}

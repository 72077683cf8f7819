//! The control section: metadata record plus lifecycle scripts

use fleetpack_api::{Labels, Scripts};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::archive;
use crate::error::PacketError;

/// Metadata record entry (YAML)
pub const CONTROL_FILE: &str = "control";
/// Pre-install script entry
pub const PRE_INSTALL: &str = "preinst";
/// Post-install script entry
pub const POST_INSTALL: &str = "postinst";
/// Pre-remove script entry
pub const PRE_REMOVE: &str = "prerm";
/// Post-remove script entry
pub const POST_REMOVE: &str = "postrm";

/// All script entry names in canonical order
pub const SCRIPT_FILES: [&str; 4] = [PRE_INSTALL, POST_INSTALL, PRE_REMOVE, POST_REMOVE];

const ENTRY_MODE: u32 = 0o600;

/// The serialized metadata record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFile {
    /// Packet name
    pub name: String,
    /// Matching labels
    #[serde(default)]
    pub labels: Labels,
}

impl ControlFile {
    /// Render as YAML
    ///
    /// # Errors
    /// Returns `PacketError::InvalidControl` if serialization fails
    pub fn to_yaml(&self) -> Result<String, PacketError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Parse from YAML
    ///
    /// # Errors
    /// Returns `PacketError::InvalidControl` for malformed YAML or a missing name
    pub fn from_yaml(text: &str) -> Result<Self, PacketError> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Decoded contents of `control.tar.xz`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ControlSection {
    pub(crate) control: ControlFile,
    pub(crate) scripts: Scripts,
}

pub(crate) fn encode(control: &ControlFile, scripts: &Scripts) -> Result<Vec<u8>, PacketError> {
    let mut builder = tar::Builder::new(Vec::new());
    archive::append_bytes(
        &mut builder,
        CONTROL_FILE,
        ENTRY_MODE,
        control.to_yaml()?.as_bytes(),
    )?;
    for (name, body) in SCRIPT_FILES.iter().zip(script_bodies(scripts)) {
        archive::append_bytes(&mut builder, name, ENTRY_MODE, body.as_bytes())?;
    }
    let tar_bytes = builder.into_inner()?;
    archive::compress(&tar_bytes)
}

/// Decode a control section; entries may come in any order, unknown ones are
/// ignored and absent scripts decode as empty
pub(crate) fn decode(compressed: &[u8], limit: u64) -> Result<ControlSection, PacketError> {
    let tar_bytes = archive::decompress(compressed, limit)?;
    let mut tar = tar::Archive::new(tar_bytes.as_slice());

    let mut control = None;
    let mut scripts = Scripts::default();

    for entry in tar.entries().map_err(PacketError::malformed)? {
        let mut entry = entry.map_err(PacketError::malformed)?;
        let name = entry
            .path()
            .map_err(PacketError::malformed)?
            .to_string_lossy()
            .into_owned();

        let slot = match name.trim_start_matches("./") {
            CONTROL_FILE => {
                let body = archive::read_entry(&mut entry)?;
                let text = String::from_utf8(body).map_err(|e| PacketError::InvalidEntry {
                    path: name.clone(),
                    reason: e.to_string(),
                })?;
                control = Some(ControlFile::from_yaml(&text)?);
                continue;
            }
            PRE_INSTALL => &mut scripts.pre_install,
            POST_INSTALL => &mut scripts.post_install,
            PRE_REMOVE => &mut scripts.pre_remove,
            POST_REMOVE => &mut scripts.post_remove,
            other => {
                debug!(entry = %other, "ignoring unknown control entry");
                continue;
            }
        };

        let body = archive::read_entry(&mut entry)?;
        *slot = String::from_utf8(body).map_err(|e| PacketError::InvalidEntry {
            path: name.clone(),
            reason: e.to_string(),
        })?;
    }

    Ok(ControlSection {
        control: control.ok_or(PacketError::MissingEntry(CONTROL_FILE))?,
        scripts,
    })
}

fn script_bodies(scripts: &Scripts) -> [&str; 4] {
    [
        &scripts.pre_install,
        &scripts.post_install,
        &scripts.pre_remove,
        &scripts.post_remove,
    ]
}

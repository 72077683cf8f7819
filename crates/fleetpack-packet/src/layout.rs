//! On-disk build layout
//!
//! ```text
//! <dir>/
//!   control     name + labels (YAML)
//!   preinst
//!   postinst
//!   prerm
//!   postrm
//!   data/       tree installed under the target root
//! ```

use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use fleetpack_api::{Labels, Scripts};
use tracing::{debug, info};

use crate::control::{
    CONTROL_FILE, ControlFile, POST_INSTALL, POST_REMOVE, PRE_INSTALL, PRE_REMOVE, SCRIPT_FILES,
};
use crate::error::PacketError;
use crate::packet::Packet;
use crate::payload::Payload;

/// Name of the payload subdirectory
pub const DATA_DIR: &str = "data";

const SCRIPT_MODE: u32 = 0o755;
const SCRIPT_STUB: &str = "#!/bin/sh\n";

/// Build a packet from a directory laid out as above
///
/// Missing script files are treated as empty scripts.
///
/// # Errors
/// Fails if `dir` has no `control` file, the control file is malformed, or
/// `data` exists but is not a directory
pub fn build_from_directory(dir: &Path) -> Result<Packet, PacketError> {
    if !dir.is_dir() {
        return Err(PacketError::NotADirectory(dir.to_path_buf()));
    }

    let control_text = match fs::read_to_string(dir.join(CONTROL_FILE)) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(PacketError::MissingEntry(CONTROL_FILE));
        }
        Err(e) => return Err(e.into()),
    };
    let control = ControlFile::from_yaml(&control_text)?;

    let scripts = Scripts {
        pre_install: read_script(dir, PRE_INSTALL)?,
        post_install: read_script(dir, POST_INSTALL)?,
        pre_remove: read_script(dir, PRE_REMOVE)?,
        post_remove: read_script(dir, POST_REMOVE)?,
    };

    let data_dir = dir.join(DATA_DIR);
    let payload = if data_dir.exists() {
        Payload::from_directory(&data_dir)?
    } else {
        debug!(dir = %dir.display(), "no data directory, building empty payload");
        Payload::new()
    };

    info!(
        name = %control.name,
        entries = payload.entries().len(),
        "built packet from directory"
    );

    Ok(Packet::new(control.name, control.labels)
        .with_scripts(scripts)
        .with_payload(payload))
}

/// Write an empty build layout into `dir`
///
/// `dir` is created if missing. Script stubs are executable shell files
/// containing only a shebang.
///
/// # Errors
/// Fails with `DirectoryNotEmpty` if `dir` already has content, or
/// `NotADirectory` if it is a file
pub fn init_directory(dir: &Path, name: &str, labels: &Labels) -> Result<(), PacketError> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(PacketError::NotADirectory(dir.to_path_buf()));
        }
        if fs::read_dir(dir)?.next().is_some() {
            return Err(PacketError::DirectoryNotEmpty(dir.to_path_buf()));
        }
    }

    fs::create_dir_all(dir.join(DATA_DIR))?;

    let control = ControlFile {
        name: name.to_string(),
        labels: labels.clone(),
    };
    fs::write(dir.join(CONTROL_FILE), control.to_yaml()?)?;

    for script in SCRIPT_FILES {
        let path = dir.join(script);
        fs::write(&path, SCRIPT_STUB)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(SCRIPT_MODE))?;
    }

    info!(dir = %dir.display(), name, "initialized packet directory");
    Ok(())
}

fn read_script(dir: &Path, script: &str) -> Result<String, PacketError> {
    match fs::read_to_string(dir.join(script)) {
        Ok(body) => Ok(body),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

//! fleetpack-pkg: Packet installation
//!
//! Applies a packet's payload under an install root and runs its lifecycle
//! scripts, and reverses that on removal.

pub mod error;
pub mod fs;
pub mod traits;
pub mod types;

pub use error::InstallError;
pub use fs::FsInstaller;
pub use traits::Installer;
pub use types::{InstallReport, ScriptPhase};

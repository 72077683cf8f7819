//! fleetpack-exec: Lifecycle script execution
//!
//! Packet scripts are shell snippets run on the device around payload
//! installation and removal.

pub mod error;
pub mod local;
pub mod result;
pub mod traits;

pub use error::ExecError;
pub use local::LocalExecutor;
pub use result::CommandResult;
pub use traits::ScriptExecutor;

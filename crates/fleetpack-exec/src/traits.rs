//! Script executor trait

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::CommandResult;

/// Runs lifecycle scripts
///
/// A non-zero exit status is reported through [`CommandResult`], not as an
/// error; errors mean the script could not be run at all.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    /// Run a script to completion
    async fn run(&self, script: &str) -> Result<CommandResult, ExecError>;

    /// Short identifier used in logs
    fn executor_type(&self) -> &'static str;
}

//! Local script execution using `tokio::process`

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, instrument};

use crate::error::ExecError;
use crate::result::CommandResult;
use crate::traits::ScriptExecutor;

const DEFAULT_SHELL: &str = "/bin/sh";

/// Local script executor
///
/// Scripts are passed to `<shell> -c`, so they may use pipes, redirections
/// and multiple lines. Output is captured into the [`CommandResult`] unless
/// the executor was built with [`LocalExecutor::inherit_stdio`].
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    shell: PathBuf,
    inherit_stdio: bool,
}

impl LocalExecutor {
    /// Create an executor using `/bin/sh`
    #[must_use]
    pub fn new() -> Self {
        Self {
            shell: PathBuf::from(DEFAULT_SHELL),
            inherit_stdio: false,
        }
    }

    /// Let scripts write straight to this process's stdout and stderr
    #[must_use]
    pub fn inherit_stdio(mut self) -> Self {
        self.inherit_stdio = true;
        self
    }

    #[instrument(skip(self, script), level = "debug")]
    async fn execute(&self, script: &str) -> Result<CommandResult, ExecError> {
        let start = Instant::now();

        debug!(shell = %self.shell.display(), "executing script");

        let output_stdio = || {
            if self.inherit_stdio {
                Stdio::inherit()
            } else {
                Stdio::piped()
            }
        };

        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(output_stdio())
            .stderr(output_stdio())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| ExecError::SpawnError {
            shell: self.shell.display().to_string(),
            reason: e.to_string(),
        })?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let duration = start.elapsed();

        let status = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        debug!(
            status = status,
            duration = ?duration,
            stdout = %stdout.trim_end(),
            "script completed"
        );

        if !output.status.success() {
            error!(
                status = status,
                stderr = %stderr.trim_end(),
                "script failed"
            );
        }

        Ok(CommandResult {
            status,
            stdout,
            stderr,
            duration,
        })
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScriptExecutor for LocalExecutor {
    async fn run(&self, script: &str) -> Result<CommandResult, ExecError> {
        self.execute(script).await
    }

    fn executor_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_success() {
        let executor = LocalExecutor::new();
        let result = executor.run("echo hello").await.unwrap();

        assert!(result.success());
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_failure() {
        let executor = LocalExecutor::new();
        let result = executor.run("exit 42").await.unwrap();

        assert!(!result.success());
        assert_eq!(result.status, 42);
    }

    #[tokio::test]
    async fn test_multiline_script() {
        let executor = LocalExecutor::new();
        let result = executor
            .run("#!/bin/sh\nA=one\necho \"$A two\" >&2\n")
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(result.stderr.trim(), "one two");
    }

    #[tokio::test]
    async fn test_inherited_output_is_not_captured() {
        let executor = LocalExecutor::new().inherit_stdio();
        let result = executor.run("echo visible").await.unwrap();

        assert!(result.success());
        assert!(result.stdout.is_empty());
    }
}

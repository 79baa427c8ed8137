//! The runner trait and the real process-backed implementation

use async_process::Stdio;
use async_trait::async_trait;
use tracing::debug;

use crate::command::Command;
use crate::error::{Error, Result};
use crate::output::CommandOutput;

/// Executes commands and captures their output.
///
/// This is the single seam between the provisioning logic and the outside
/// world. Production code uses [`ProcessRunner`]; tests script responses
/// with `ScriptedRunner`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion and capture its output
    async fn run(&self, command: Command) -> Result<CommandOutput>;
}

/// Runs commands as local child processes via `async-process`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Create a new process runner
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: Command) -> Result<CommandOutput> {
        debug!(command = %command.display(), "executing");

        let mut async_cmd = command.prepare();
        async_cmd.stdout(Stdio::piped());
        async_cmd.stderr(Stdio::piped());

        let output = async_cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::CommandNotFound {
                    command: command.get_program().to_string(),
                }
            } else {
                Error::spawn_failed(e.to_string())
            }
        })?;

        let result = CommandOutput::new(
            output.status.code(),
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        );

        debug!(
            command = %command.display(),
            code = ?result.status.code,
            "completed"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[smol_potat::test]
    async fn test_run_captures_stdout() {
        let runner = ProcessRunner::new();
        let output = runner.run(Command::new("echo").arg("hello")).await.unwrap();

        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[smol_potat::test]
    async fn test_run_missing_binary() {
        let runner = ProcessRunner::new();
        let result = runner
            .run(Command::new("definitely-not-a-real-binary-3141"))
            .await;

        assert!(matches!(result, Err(Error::CommandNotFound { .. })));
    }

    #[smol_potat::test]
    async fn test_run_nonzero_exit_is_not_an_error() {
        let runner = ProcessRunner::new();
        let output = runner
            .run(Command::new("sh").args(["-c", "echo oops >&2; exit 3"]))
            .await
            .unwrap();

        assert!(!output.success());
        assert_eq!(output.status.code, Some(3));
        assert_eq!(output.error_line(), "oops");
    }
}

//! Captured output of a completed command

use crate::error::{Error, Result};

/// Process exit status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code if the process exited normally
    pub code: Option<i32>,
}

impl ExitStatus {
    /// Returns true if the process exited successfully (code 0)
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// The captured result of a command that ran to completion
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit status of the process
    pub status: ExitStatus,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Construct an output from raw parts
    pub fn new(code: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            status: ExitStatus { code },
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// A successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self::new(Some(0), stdout, "")
    }

    /// A failed output with the given exit code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self::new(Some(code), "", stderr)
    }

    /// Returns true if the command exited with code 0
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Parse the captured stdout as a JSON document
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_str(self.stdout.trim()).map_err(|e| Error::UnparsableOutput {
            reason: e.to_string(),
        })
    }

    /// The first line of stderr, for compact failure messages
    pub fn error_line(&self) -> &str {
        self.stderr.lines().next().unwrap_or("").trim_end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        assert!(CommandOutput::ok("{}").success());
        assert!(!CommandOutput::failed(1, "boom").success());
        assert!(!CommandOutput::new(None, "", "").success());
    }

    #[test]
    fn test_json_parsing() {
        let output = CommandOutput::ok("{\"name\": \"rg-demo-dev\"}\n");
        let value = output.json().unwrap();
        assert_eq!(value["name"], "rg-demo-dev");

        let bad = CommandOutput::ok("not json");
        assert!(matches!(bad.json(), Err(Error::UnparsableOutput { .. })));
    }

    #[test]
    fn test_error_line() {
        let output = CommandOutput::failed(1, "ERROR: something broke\nmore detail\n");
        assert_eq!(output.error_line(), "ERROR: something broke");
    }
}

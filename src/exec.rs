//! Short-lived external command execution.
//!
//! The `CommandExecutor` trait lets the duration probe and the preflight
//! check run against a mock in tests instead of a real `ffprobe`.

use crate::error::{Result, StillcastError};
use std::ffi::OsStr;
use std::process::{Command, Stdio};

/// Trait for executing system commands that run to completion.
///
/// Object-safe, Send + Sync so it can be shared with the batch worker.
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with arguments.
    ///
    /// Returns the stdout of the command on success.
    /// Returns an error if the command fails or is not found.
    fn execute(&self, command: &OsStr, args: &[&OsStr]) -> Result<String>;
}

/// Production command executor using std::process::Command.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor;

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, command: &OsStr, args: &[&OsStr]) -> Result<String> {
        let tool = command.to_string_lossy().to_string();
        let output = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StillcastError::ToolNotFound { tool: tool.clone() }
                } else {
                    StillcastError::ToolFailed {
                        tool: tool.clone(),
                        message: format!("failed to execute: {}", e),
                    }
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StillcastError::ToolFailed {
                tool,
                message: format!("exited with {}: {}", output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

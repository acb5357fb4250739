//! Command execution utilities
//!
//! Runs the actions declared by manifest tasks (shell commands, argv
//! commands, script files) in a working directory with the plugin's
//! environment, appending the task's trailing arguments.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::types::{KboxError, KboxResult};

/// Executes the commands of one task.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    task: String,
    working_dir: PathBuf,
    env: Vec<(String, String)>,
}

impl CommandExecutor {
    pub fn new(task: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            task: task.into(),
            working_dir: working_dir.into(),
            env: Vec::new(),
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn failure(&self, message: String) -> KboxError {
        KboxError::TaskFailed {
            task: self.task.clone(),
            message,
        }
    }

    /// Execute a command with common setup and error handling
    pub fn execute_command(
        &self,
        command: &mut Command,
        execution_error_message: &str,
        failure_error_message: &str,
    ) -> KboxResult<()> {
        command.current_dir(&self.working_dir);
        command.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        tracing::debug!(task = %self.task, command = ?command, "Executing command");
        let status = command
            .status()
            .map_err(|e| self.failure(format!("{}: {}", execution_error_message, e)))?;

        if !status.success() {
            return Err(self.failure(format!(
                "{}: {}",
                failure_error_message,
                status.code().unwrap_or(-1)
            )));
        }
        Ok(())
    }

    /// Execute a script file
    pub fn execute_script(&self, script_path: &str, args: &[String]) -> KboxResult<()> {
        let script_path_buf = PathBuf::from(script_path);

        // Relative scripts live next to the task's working directory
        let full_script_path = if script_path_buf.is_relative() {
            self.working_dir.join(script_path_buf)
        } else {
            script_path_buf
        };

        if !full_script_path.exists() {
            return Err(self.failure(format!(
                "Script file '{}' not found",
                full_script_path.display()
            )));
        }

        let mut command = Command::new(&full_script_path);
        command.args(args);
        self.execute_command(
            &mut command,
            &format!("Failed to execute script: {}", full_script_path.display()),
            "Script execution failed with exit code",
        )
    }

    /// Execute a command with arguments
    pub fn execute_command_with_args(&self, command_path: &str, args: &[String]) -> KboxResult<()> {
        let mut command = Command::new(command_path);
        command.args(args);
        self.execute_command(
            &mut command,
            &format!("Failed to execute command '{}'", command_path),
            &format!("Command '{}' failed with exit code", command_path),
        )
    }

    /// Execute a single shell command; `args` become `$1`, `$2`, ...
    pub fn execute_shell_command(&self, cmd: &str, args: &[String]) -> KboxResult<()> {
        let mut command = Command::new("sh");
        command.arg("-c").arg(cmd).arg("sh").args(args);
        self.execute_command(
            &mut command,
            &format!("Failed to execute command '{}'", cmd),
            &format!("Command '{}' failed with exit code", cmd),
        )
    }
}

//! Command execution abstraction for the installer.
//!
//! This module provides:
//! - [`CommandSpec`]: Specification for commands to execute
//! - [`ExecutionResult`]: Result of command execution
//! - [`CommandExecutor`]: Trait for command execution strategies
//! - [`RealCommandExecutor`]: Production implementation using `std::process::Command`
//!
//! Database steps talk to the server through the `mysql` client, so every
//! statement the installer issues goes through a [`CommandExecutor`].

mod pipe;
mod real;

use std::process::ExitStatus;

use anyhow::Result;
use camino::Utf8PathBuf;

pub use real::RealCommandExecutor;

/// Formats string arguments into a space-separated, debug-quoted string.
pub(crate) fn format_command_args(args: &[String]) -> String {
    args.iter()
        .map(|a| format!("{:?}", a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Specification for a command to be executed
#[derive(Clone)]
pub struct CommandSpec {
    /// The command to execute (e.g., "mysql")
    pub command: String,
    /// Command arguments
    pub args: Vec<String>,
    /// Working directory (optional, defaults to current directory)
    pub cwd: Option<Utf8PathBuf>,
    /// Environment variables to set (in addition to inherited environment)
    pub env: Vec<(String, String)>,
    /// Data written to the command's standard input
    pub stdin: Option<String>,
    /// Collect stdout into [`ExecutionResult::stdout`] instead of logging it
    pub capture_stdout: bool,
}

impl CommandSpec {
    /// Creates a new CommandSpec with command and args
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            cwd: None,
            env: Vec::new(),
            stdin: None,
            capture_stdout: false,
        }
    }

    /// Sets the working directory
    #[must_use]
    pub fn with_cwd(mut self, cwd: Utf8PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }

    /// Adds an environment variable
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Sets the data piped into the command's standard input
    #[must_use]
    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Requests that stdout be captured and returned
    #[must_use]
    pub fn capturing_stdout(mut self) -> Self {
        self.capture_stdout = true;
        self
    }
}

// Environment values may carry credentials (MYSQL_PWD), so only keys are shown.
impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("command", &self.command)
            .field("args", &self.args)
            .field("cwd", &self.cwd)
            .field("env", &self.env.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>())
            .field("stdin", &self.stdin.as_ref().map(|s| s.len()))
            .field("capture_stdout", &self.capture_stdout)
            .finish()
    }
}

/// Result of command execution
#[derive(Debug, Default)]
pub struct ExecutionResult {
    /// Exit status of the command (None in dry-run mode)
    pub status: Option<ExitStatus>,
    /// Captured stdout, present only when `capture_stdout` was set
    pub stdout: Option<String>,
}

impl ExecutionResult {
    /// Returns true if the command executed successfully.
    ///
    /// In dry-run mode (status is None), this always returns true.
    pub fn success(&self) -> bool {
        self.status.is_none_or(|s| s.success())
    }

    /// Returns the exit code if available
    pub fn code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }
}

/// Trait for command execution.
///
/// Implementations must be `Send + Sync` so one executor can be shared as
/// `Arc<dyn CommandExecutor>` between the execution context and the steps.
pub trait CommandExecutor: Send + Sync {
    /// Executes a command with the given specification.
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult>;
}

//! Real command executor implementation.
//!
//! This module provides [`RealCommandExecutor`], which executes commands
//! using `std::process::Command`, feeding stdin from the `CommandSpec` and either
//! streaming stdout to the log or capturing it.

use std::process::{Child, Command, Stdio};
use std::thread;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use which::which;

use super::pipe::{
    StreamType, panic_message, read_pipe_to_log, read_pipe_to_string, write_stdin,
};
use super::{CommandExecutor, CommandSpec, ExecutionResult, format_command_args};
use crate::error::InstallError;

type IoHandle = JoinHandle<Option<String>>;

/// Kills a child process and joins its stdio threads.
///
/// Called from error paths in [`RealCommandExecutor::execute()`] so that a
/// failed spawn or wait never leaks a process or a thread.
fn cleanup_child_process<I>(child: &mut Child, handles: I)
where
    I: IntoIterator<Item = IoHandle>,
{
    let pid = child.id();
    if let Err(e) = child.kill() {
        tracing::debug!(pid = pid, "kill returned error (process may have already exited): {}", e);
    }
    if let Err(e) = child.wait() {
        tracing::warn!(pid = pid, "failed to wait for child process after kill: {}", e);
    }
    for handle in handles {
        if let Err(e) = handle.join() {
            tracing::warn!("stdio thread panicked during cleanup: {}", panic_message(&*e));
        }
    }
}

fn execution_error(spec: &CommandSpec, status: String) -> anyhow::Error {
    InstallError::Execution {
        command: format!("{} {}", spec.command, format_command_args(&spec.args)),
        status,
    }
    .into()
}

/// Command executor that runs actual system commands.
///
/// When `dry_run` is true, commands are logged but not executed,
/// and `execute()` returns an empty [`ExecutionResult`].
pub struct RealCommandExecutor {
    pub dry_run: bool,
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        if self.dry_run {
            tracing::info!("dry run: {} {}", spec.command, format_command_args(&spec.args));
            return Ok(ExecutionResult::default());
        }

        let cmd =
            which(&spec.command).with_context(|| format!("command not found: {}", spec.command))?;
        tracing::trace!("command found: {}: {}", spec.command, cmd.to_string_lossy());

        let mut command = Command::new(cmd);
        command.args(&spec.args);

        if let Some(ref cwd) = spec.cwd {
            command.current_dir(cwd);
        }

        for (key, value) in &spec.env {
            command.env(key, value);
        }

        command.stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command.spawn().with_context(|| {
            format!("failed to spawn command `{}` with args {:?}", spec.command, spec.args)
        })?;

        tracing::trace!("spawned command: {}: pid={}", spec.command, child.id());

        let stdin_pipe = child.stdin.take();
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let mut handles: Vec<(&'static str, IoHandle)> = Vec::with_capacity(3);

        if let Some(input) = spec.stdin.clone() {
            match thread::Builder::new()
                .name("stdin-writer".to_string())
                .spawn(move || {
                    write_stdin(stdin_pipe, &input);
                    None
                }) {
                Ok(handle) => handles.push(("stdin", handle)),
                Err(e) => {
                    cleanup_child_process(&mut child, handles.into_iter().map(|(_, h)| h));
                    return Err(execution_error(
                        spec,
                        format!("failed to spawn stdin writer thread: {}", e),
                    ));
                }
            }
        }

        let capture = spec.capture_stdout;
        match thread::Builder::new()
            .name("stdout-reader".to_string())
            .spawn(move || {
                if capture {
                    Some(read_pipe_to_string(stdout_pipe))
                } else {
                    read_pipe_to_log(stdout_pipe, StreamType::Stdout);
                    None
                }
            }) {
            Ok(handle) => handles.push(("stdout", handle)),
            Err(e) => {
                cleanup_child_process(&mut child, handles.into_iter().map(|(_, h)| h));
                return Err(execution_error(
                    spec,
                    format!("failed to spawn stdout reader thread: {}", e),
                ));
            }
        }

        match thread::Builder::new()
            .name("stderr-reader".to_string())
            .spawn(move || {
                read_pipe_to_log(stderr_pipe, StreamType::Stderr);
                None
            }) {
            Ok(handle) => handles.push(("stderr", handle)),
            Err(e) => {
                cleanup_child_process(&mut child, handles.into_iter().map(|(_, h)| h));
                return Err(execution_error(
                    spec,
                    format!("failed to spawn stderr reader thread: {}", e),
                ));
            }
        }

        let status = match child.wait() {
            Ok(s) => s,
            Err(e) => {
                cleanup_child_process(&mut child, handles.into_iter().map(|(_, h)| h));
                return Err(execution_error(spec, format!("failed to wait for command: {}", e)));
            }
        };

        let mut stdout = None;
        let mut panicked_streams = Vec::new();
        for (name, handle) in handles {
            match handle.join() {
                Ok(Some(output)) => stdout = Some(output),
                Ok(None) => {}
                Err(e) => {
                    let msg = panic_message(&*e);
                    tracing::error!(stream = name, panic = msg, "stdio thread panicked");
                    panicked_streams.push(format!("{}: {}", name, msg));
                }
            }
        }

        if !panicked_streams.is_empty() {
            return Err(execution_error(
                spec,
                format!(
                    "stdio thread(s) panicked during command execution: {}",
                    panicked_streams.join(", ")
                ),
            ));
        }

        tracing::trace!("executed command: {}: success={}", spec.command, status.success());

        Ok(ExecutionResult {
            status: Some(status),
            stdout,
        })
    }
}

//! Domain-specific error types for the installer.
//!
//! `InstallError` separates the two phases of an installation attempt:
//! `ValidationFailed` is raised while assembling the configuration, before
//! anything external has been touched, and `StepFailed` is raised while the
//! pipeline runs, wrapping the failing step's own error untouched.
//!
//! Step and executor trait boundaries use `anyhow::Result`; `InstallError`
//! converts into `anyhow::Error` through `?` where needed.

use std::io;

use crate::pipeline::PipelineState;

/// Formats an IO error kind into a human-readable message.
///
/// Gives consistent messages for the common kinds (e.g., "I/O error: not found")
/// instead of the OS-level text. Unrecognized kinds fall back to the OS message.
pub(crate) fn io_error_kind_message(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "I/O error: not found".to_string(),
        io::ErrorKind::PermissionDenied => "I/O error: permission denied".to_string(),
        io::ErrorKind::AlreadyExists => "I/O error: already exists".to_string(),
        io::ErrorKind::IsADirectory => "I/O error: is a directory".to_string(),
        _ => format!("I/O error: {}", err),
    }
}

/// Error type for an installation attempt.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum InstallError {
    /// The submitted input was rejected before any step executed.
    ///
    /// The message is meant to be shown to the operator as-is.
    #[error("{0}")]
    ValidationFailed(String),

    /// A step failed while the pipeline was running.
    ///
    /// Earlier steps may already have left side effects behind.
    #[error("installation step '{step}' failed: {source}")]
    StepFailed {
        /// Name of the step that failed.
        step: String,
        /// The step's own error, preserved without reinterpretation.
        #[source]
        source: anyhow::Error,
    },

    /// `run()` was called on a pipeline that has already been run.
    #[error("installation pipeline has already been run (state: {state})")]
    AlreadyRun {
        /// State the pipeline was left in by the earlier run.
        state: PipelineState,
    },

    /// A command execution failed (non-zero exit, spawn failure, wait failure, thread panic).
    #[error("command execution failed: {command}: {status}")]
    Execution {
        /// The command that was executed, with its arguments.
        command: String,
        /// Exit status or a description of the internal failure.
        status: String,
    },

    /// A form file could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O operation failed with contextual information.
    #[error("{context}: {message}")]
    Io {
        /// What was being done when the error occurred, usually including a path.
        context: String,
        /// Human-readable description derived from [`io_error_kind_message`].
        message: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl InstallError {
    /// Creates a `ValidationFailed` error from any message.
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed(message.into())
    }

    /// Creates an `Io` variant with the `message` derived from `source`.
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: io_error_kind_message(&source),
            source,
        }
    }

    /// Returns true for errors raised before any external effect took place.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationFailed(_))
    }

    /// Returns the underlying cause of a `StepFailed` error.
    pub fn cause(&self) -> Option<&anyhow::Error> {
        match self {
            Self::StepFailed { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Message suitable for showing to the operator.
    ///
    /// For `StepFailed` this is the cause's own message (with its context chain)
    /// rather than the wrapper text.
    pub fn operator_message(&self) -> String {
        match self {
            Self::StepFailed { source, .. } => format!("{:#}", source),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_is_bare_message() {
        let err = InstallError::validation("The admin password did not match its confirmation.");
        assert_eq!(err.to_string(), "The admin password did not match its confirmation.");
        assert!(err.is_validation());
        assert!(err.cause().is_none());
    }

    #[test]
    fn test_step_failed_display() {
        let err = InstallError::StepFailed {
            step: "connect".to_string(),
            source: anyhow::anyhow!("connection refused"),
        };
        assert_eq!(err.to_string(), "installation step 'connect' failed: connection refused");
        assert!(!err.is_validation());
    }

    #[test]
    fn test_step_failed_operator_message_is_cause() {
        let err = InstallError::StepFailed {
            step: "store-config".to_string(),
            source: anyhow::anyhow!("disk full").context("failed to write config.yaml"),
        };
        assert_eq!(err.operator_message(), "failed to write config.yaml: disk full");
    }

    #[test]
    fn test_step_failed_source_preserved() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = InstallError::StepFailed {
            step: "publish-assets".to_string(),
            source: anyhow::Error::new(io_err),
        };
        let cause = err.cause().expect("step failure should carry a cause");
        let io_cause = cause.downcast_ref::<io::Error>().expect("cause should be io::Error");
        assert_eq!(io_cause.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_already_run_display() {
        let err = InstallError::AlreadyRun {
            state: PipelineState::Completed,
        };
        assert_eq!(err.to_string(), "installation pipeline has already been run (state: completed)");
    }

    #[test]
    fn test_execution_display() {
        let err = InstallError::Execution {
            command: "mysql \"--batch\"".to_string(),
            status: "exit status: 1".to_string(),
        };
        assert_eq!(err.to_string(), "command execution failed: mysql \"--batch\": exit status: 1");
    }

    #[test]
    fn test_io_display() {
        let err = InstallError::io(
            "/srv/forum/config.yaml",
            io::Error::new(io::ErrorKind::NotFound, "entity not found"),
        );
        assert_eq!(err.to_string(), "/srv/forum/config.yaml: I/O error: not found");
    }

    #[test]
    fn test_io_error_kind_message_other() {
        let err = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        assert!(io_error_kind_message(&err).starts_with("I/O error: "));
    }

    #[test]
    fn test_into_anyhow_error() {
        let err = InstallError::validation("test");
        let anyhow_err: anyhow::Error = err.into();
        let downcast = anyhow_err.downcast_ref::<InstallError>();
        assert!(matches!(downcast, Some(InstallError::ValidationFailed(_))));
    }
}

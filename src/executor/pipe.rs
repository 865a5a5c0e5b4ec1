//! Internal utilities for command stdio.
//!
//! Handles streaming stdout/stderr into the log, collecting stdout when a
//! caller needs the output, and feeding stdin.

use std::io::{BufRead, BufReader, Read, Write};

/// Type of output stream for logging purposes.
#[derive(Clone, Copy)]
pub(super) enum StreamType {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Extracts a human-readable message from a thread panic.
pub(super) fn panic_message(err: &(dyn std::any::Any + Send)) -> &str {
    err.downcast_ref::<&str>()
        .copied()
        .or_else(|| err.downcast_ref::<String>().map(|s| s.as_str()))
        .unwrap_or("unknown panic")
}

/// Reads from a pipe and logs each line as it arrives.
///
/// - stdout is logged at DEBUG level, stderr at WARN level
/// - Binary data uses lossy UTF-8 conversion
/// - I/O errors stop reading but don't fail command execution
pub(super) fn read_pipe_to_log<R: Read>(pipe: Option<R>, stream_type: StreamType) {
    let Some(pipe) = pipe else {
        tracing::error!(stream = %stream_type, "pipe was None, no output will be captured");
        return;
    };

    let mut reader = BufReader::new(pipe);
    let mut line_buf = Vec::new();

    loop {
        line_buf.clear();
        match reader.read_until(b'\n', &mut line_buf) {
            Ok(0) => break,
            Ok(_) => {
                let log_content = line_buf.strip_suffix(b"\n").unwrap_or(&line_buf);
                log_line(log_content, stream_type);
            }
            Err(e) => {
                tracing::error!(stream = %stream_type, error = %e, "I/O error, stopping read");
                break;
            }
        }
    }
}

/// Reads a pipe to the end and returns its content.
pub(super) fn read_pipe_to_string<R: Read>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe
        && let Err(e) = pipe.read_to_end(&mut buf)
    {
        tracing::error!(error = %e, "I/O error while capturing stdout");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Writes `input` to the child's stdin and closes it.
///
/// A broken pipe means the child exited early; its exit status reports why.
pub(super) fn write_stdin<W: Write>(pipe: Option<W>, input: &str) {
    let Some(mut pipe) = pipe else {
        tracing::error!("stdin pipe was None, input was not delivered");
        return;
    };
    if let Err(e) = pipe.write_all(input.as_bytes()) {
        tracing::debug!(error = %e, "failed to write command stdin");
    }
}

/// Logs a complete line at the appropriate level.
///
/// Trailing CR is trimmed to handle CRLF line endings.
fn log_line(line: &[u8], stream_type: StreamType) {
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim_end_matches('\r');
    match stream_type {
        StreamType::Stdout => tracing::debug!(stream = %stream_type, "{}", trimmed),
        StreamType::Stderr => tracing::warn!(stream = %stream_type, "{}", trimmed),
    }
}

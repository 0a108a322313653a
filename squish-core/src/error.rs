//! Error types for squish-core.
//!
//! All fallible operations in the library return [`CoreResult`]. The helper
//! constructors keep call sites for external command failures terse and
//! consistent.

use std::process::ExitStatus;
use thiserror::Error;

/// Custom error types for squish
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command '{cmd}' failed to start: {source}")]
    CommandStart {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{cmd}' failed while running: {source}")]
    CommandWait {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{cmd}' exited with status {status}: {stderr}")]
    CommandFailed {
        cmd: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Required external tool not found: {0}")]
    DependencyNotFound(String),

    #[error("ffprobe parse error: {0}")]
    FfprobeParse(String),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Invalid path: {0}")]
    PathError(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unsupported media: {0}")]
    Unsupported(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Job registry error: {0}")]
    Registry(String),
}

/// Result type for squish operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Builds a [`CoreError::CommandStart`] for a command that could not be spawned.
pub fn command_start_error(cmd: impl Into<String>, source: std::io::Error) -> CoreError {
    CoreError::CommandStart {
        cmd: cmd.into(),
        source,
    }
}

/// Builds a [`CoreError::CommandWait`] for a command that failed while being waited on.
pub fn command_wait_error(cmd: impl Into<String>, source: std::io::Error) -> CoreError {
    CoreError::CommandWait {
        cmd: cmd.into(),
        source,
    }
}

/// Builds a [`CoreError::CommandFailed`] for a command that exited unsuccessfully.
pub fn command_failed_error(
    cmd: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed {
        cmd: cmd.into(),
        status,
        stderr: stderr.into(),
    }
}

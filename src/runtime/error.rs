// ABOUTME: Runtime error types with SNAFU pattern.
// ABOUTME: Unifies external command, tool detection and container API failures.

use snafu::Snafu;
use std::path::PathBuf;

/// Failure while driving an external tool or the container engine.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EngineError {
    #[snafu(display("failed to run `{program}`: {source}"))]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[snafu(display("`{command}` failed ({status}): {stderr}"))]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[snafu(display("required tool `{tool}` is not available"))]
    ToolMissing { tool: String },

    #[snafu(display("container runtime is not running: {message}"))]
    RuntimeDown { message: String },

    #[snafu(display("container runtime API error: {source}"))]
    Api { source: bollard::errors::Error },

    #[snafu(display("failed to update {}: {message}", path.display()))]
    ComposeRewrite { path: PathBuf, message: String },

    #[snafu(display("I/O error on {}: {source}", path.display()))]
    FileAccess {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// A required executable could not be found or started.
    ToolMissing,
    /// The container runtime socket is absent or not answering.
    RuntimeDown,
    /// A command ran and exited unsuccessfully.
    CommandFailed,
    /// The container API rejected a request.
    Api,
    /// Local file handling failed.
    Io,
}

impl EngineError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> EngineErrorKind {
        match self {
            EngineError::Spawn { .. } | EngineError::ToolMissing { .. } => {
                EngineErrorKind::ToolMissing
            }
            EngineError::RuntimeDown { .. } => EngineErrorKind::RuntimeDown,
            EngineError::CommandFailed { .. } => EngineErrorKind::CommandFailed,
            EngineError::Api { .. } => EngineErrorKind::Api,
            EngineError::ComposeRewrite { .. } | EngineError::FileAccess { .. } => {
                EngineErrorKind::Io
            }
        }
    }

    /// Shorthand for a failed command result.
    pub fn command_failed(
        command: impl Into<String>,
        status: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        EngineError::CommandFailed {
            command: command.into(),
            status: status.into(),
            stderr: stderr.into(),
        }
    }
}

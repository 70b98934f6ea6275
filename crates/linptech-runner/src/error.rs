//! Error types for the runner.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a runner command.
///
/// Frame outcomes are never errors here; they are reported per frame.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Failed to read an input file.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The capture file is not valid.
    #[error("invalid capture: {0}")]
    Capture(String),

    /// A command line argument is not valid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Device configuration error.
    #[error(transparent)]
    Model(#[from] linptech_model::ModelError),

    /// Frame encoding error.
    #[error(transparent)]
    Packet(#[from] mibeacon_packet::PacketError),

    /// Failed to serialize output.
    #[error("failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),

    /// Failed to install the log subscriber.
    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

impl RunnerError {
    pub fn capture(message: impl Into<String>) -> Self {
        RunnerError::Capture(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        RunnerError::InvalidArgument(message.into())
    }
}

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

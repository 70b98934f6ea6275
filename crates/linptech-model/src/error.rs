//! Error types for configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading device configuration.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Failed to read the configuration file.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that could not be read.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML did not match the configuration schema, including invalid
    /// addresses and bindkeys.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The same address is configured more than once.
    #[error("device {0} is configured more than once")]
    DuplicateDevice(String),

    /// A product id is not known to the registry.
    #[error("unknown product id 0x{0:04X}")]
    UnknownProduct(u16),
}

/// Result type alias for configuration operations.
pub type ModelResult<T> = Result<T, ModelError>;

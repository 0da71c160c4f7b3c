//! Error types shared across the workspace.

use thiserror::Error;

/// Errors produced by core types and configuration loading.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A value failed validation
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration directory could not be determined
    #[error("could not determine a configuration directory for this platform")]
    NoConfigDir,

    /// Configuration file could not be read or written
    #[error("configuration I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid TOML
    #[error("configuration parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("configuration serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

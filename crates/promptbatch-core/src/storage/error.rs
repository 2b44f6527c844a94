//! Error types for the settings store.

use thiserror::Error;

/// Errors that can occur in the settings store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The settings file could not be parsed.
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be serialized.
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The key is not one of the known setting keys.
    #[error("Unknown setting '{0}'")]
    InvalidKey(String),

    /// Item not found in storage.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data error.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

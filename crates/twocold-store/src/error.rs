//! Error types for twocold-store.

use std::path::PathBuf;

use twocold_types::{Floor, ParseError};

/// Result type for twocold-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in twocold-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No record has this floor and id.
    #[error("Device {id} not found on floor {floor}")]
    DeviceNotFound { floor: Floor, id: u32 },

    /// The persisted set holds two records with the same floor and id.
    #[error("Duplicate device {id} on floor {floor}")]
    DuplicateDevice { floor: Floor, id: u32 },

    /// The edit payload is not acceptable.
    #[error(transparent)]
    InvalidEdit(#[from] ParseError),

    /// Failed to create the store directory.
    #[error("Failed to create store directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//! Error types for ditto-core

use thiserror::Error;

/// Result type alias using ditto-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in ditto-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Durable storage failure reported by libSQL
    #[error("Storage error: {0}")]
    Storage(#[from] libsql::Error),

    /// Database layer failure that is not a libSQL error (bad row data, etc.)
    #[error("Database error: {0}")]
    Database(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Task not found
    #[error("Task not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The task store has not been opened yet
    #[error("Task store is not initialized")]
    NotInitialized,

    /// Invalid sync configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error is a missing-task error the UI can recover from by refreshing.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

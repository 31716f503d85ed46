use std::io;

use ditto_core::sync::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] ditto_core::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No task text provided")]
    EmptyText,
    #[error("Task ID cannot be empty")]
    EmptyTaskId,
    #[error("Task not found for id/prefix: {0}")]
    TaskNotFound(String),
    #[error("{0}")]
    AmbiguousTaskId(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Sync failed: {0}")]
    SyncFailed(String),
    #[error(
        "Sync is not configured. Run `ditto config set --endpoint URL` or set DITTO_SYNC_URL."
    )]
    SyncNotConfigured,
}

//! Error types for the store module.

use icingadb_configsync_core::CoreError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Key/value store request failed.
    #[error("key/value error: {0}")]
    KeyValue(String),

    /// Invalid data in storage or in a statement parameter list.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Row encoding failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A blocking database task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Task(String),

    /// Relational store is unavailable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

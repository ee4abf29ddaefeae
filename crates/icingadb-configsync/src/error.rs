//! Error types for the engine.

use icingadb_configsync_core::CoreError;
use icingadb_configsync_store::StoreError;
use icingadb_configsync_sync::SyncError;
use thiserror::Error;

/// Errors that can occur while configuring or running the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Object type or payload error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Sync error, the first one reported by any Operator.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// An Operator task died.
    #[error("task error: {0}")]
    Task(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

//! Error types for the sync engine.

use std::fmt;

use icingadb_configsync_core::{CoreError, Operation};
use icingadb_configsync_store::StoreError;
use thiserror::Error;

/// Which store a fetch went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSide {
    KeyValue,
    Relational,
}

impl fmt::Display for StoreSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreSide::KeyValue => f.write_str("key/value store"),
            StoreSide::Relational => f.write_str("relational store"),
        }
    }
}

/// Errors that can occur while syncing.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Reading IDs or config chunks failed.
    #[error("{object_type}: fetch from {side} failed: {source}")]
    Fetch {
        object_type: &'static str,
        side: StoreSide,
        #[source]
        source: StoreError,
    },

    /// A bulk statement against the relational store failed.
    #[error("{object_type}: bulk {operation} of {rows} rows failed: {source}")]
    BulkExec {
        object_type: &'static str,
        operation: Operation,
        rows: usize,
        #[source]
        source: StoreError,
    },

    /// A value that must be a checksum could not be decoded.
    #[error("{object_type}: {operation} integrity error: {source}")]
    Integrity {
        object_type: &'static str,
        operation: Operation,
        #[source]
        source: CoreError,
    },

    /// One unit failed to decode. Logged, never escalated.
    #[error("{object_type}: decoding {id} failed: {reason}")]
    Decode {
        object_type: &'static str,
        id: String,
        reason: String,
    },

    /// The operator does not hold HA responsibility.
    #[error("{0}: not responsible")]
    NotResponsible(&'static str),

    /// A sync setting is out of range.
    #[error("invalid sync config: {field} must be greater than zero")]
    ZeroSize { field: &'static str },

    /// A pipeline channel went away.
    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

//! Error types for the config sync core.

use thiserror::Error;

/// Errors raised while encoding rows for storage.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A value that must already be a checksum is not a 20-byte/40-hex form.
    #[error("invalid checksum {value:?}: {reason}")]
    InvalidChecksum { value: String, reason: String },

    /// A row produced a value list that does not match its statement.
    #[error("field count mismatch for {table}: expected {expected}, got {got}")]
    FieldCountMismatch {
        table: String,
        expected: usize,
        got: usize,
    },

    /// Unknown object type name.
    #[error("unknown object type: {0}")]
    UnknownObjectType(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

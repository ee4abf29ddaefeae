//! Storable values bound to bulk statements.

use crate::checksum::{decode_checksum, Checksum};
use crate::error::Result;

/// A single value ready to be bound to a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Binary(Checksum),
    Real(f64),
}

impl Value {
    /// Plain text column.
    pub fn text(s: &str) -> Self {
        Value::Text(s.to_string())
    }

    /// Nullable text column.
    pub fn opt_text(s: Option<&str>) -> Self {
        s.map_or(Value::Null, Value::text)
    }

    /// Floating-point column, stored in its native representation.
    pub fn real(v: f32) -> Self {
        Value::Real(f64::from(v))
    }

    /// Column holding a value that is already a checksum in hex form.
    ///
    /// Fails if the value is not a valid checksum.
    pub fn checksum(hex: &str) -> Result<Self> {
        Ok(Value::Binary(decode_checksum(hex)?))
    }

    /// Nullable checksum column. Empty means NULL.
    pub fn reference(hex: &str) -> Result<Self> {
        if hex.is_empty() {
            Ok(Value::Null)
        } else {
            Self::checksum(hex)
        }
    }

    /// Get the binary checksum, if this is one.
    pub fn as_checksum(&self) -> Option<&Checksum> {
        match self {
            Value::Binary(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<Checksum> for Value {
    fn from(c: Checksum) -> Self {
        Value::Binary(c)
    }
}

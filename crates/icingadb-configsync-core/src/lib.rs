//! # Icinga DB Config Sync Core
//!
//! Pure primitives for synchronizing monitoring configuration objects from the
//! key/value store into the relational store.
//!
//! This crate contains no I/O, no storage, no async runtime. It is pure
//! computation over rows, checksums and ID sets.
//!
//! ## Key Types
//!
//! - [`Checksum`] - 20-byte SHA-1 digest used as primary and foreign key
//! - [`Row`] - The polymorphic synchronization unit, one impl per object type
//! - [`ObjectType`] - Field list and factory of one object type
//! - [`Statements`] - Bulk insert/update/delete descriptors for one table
//! - [`Delta`] - Insert/update/delete partition of two ID sets
//!
//! ## Encoding
//!
//! Rows keep readable values in memory. Identifiers and reference columns are
//! encoded through [`checksum`] and [`decode_checksum`] only when a value list
//! is built for a statement.

pub mod bulk;
pub mod checksum;
pub mod delta;
pub mod error;
pub mod objects;
pub mod row;
pub mod value;

pub use bulk::{BulkDeleteStmt, BulkInsertStmt, BulkUpdateStmt, Operation, Statements};
pub use checksum::{checksum, decode_checksum, storage_bool, Checksum, BOOL_REPR};
pub use delta::{delta, Delta};
pub use error::{CoreError, Result};
pub use objects::{ObjectType, HOST, HOSTGROUP};
pub use row::{populate_from, Row, RowFactory};
pub use value::Value;

//! # Icinga DB Config Sync Store
//!
//! The two store collaborators of the sync engine, behind async traits:
//!
//! - [`ConfigStore`] - the key/value store holding authoritative config
//!   objects as hashes (`icinga:config:<type>`, `icinga:config:checksum:<type>`)
//! - [`RelationalStore`] - the SQL database the engine keeps in sync
//!
//! Implementations:
//!
//! - [`MemoryConfigStore`] / [`MemoryRelationalStore`] - in-memory, for tests
//! - [`SqliteStore`] - rusqlite-backed relational store
//!
//! ## Usage
//!
//! ```rust,no_run
//! use icingadb_configsync_core::Statements;
//! use icingadb_configsync_core::objects::HOST;
//! use icingadb_configsync_store::{RelationalStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open_memory().unwrap();
//!     let stmts = Statements::for_object(&HOST);
//!
//!     let ids = store.fetch_all_ids(HOST.table()).await.unwrap();
//!     assert!(ids.is_empty());
//!
//!     // let rows: Vec<Vec<Value>> = ...;
//!     // store.bulk_insert(&stmts.insert, rows).await.unwrap();
//! #   let _ = stmts;
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Lazy chunk streams**: config payloads are fetched chunk by chunk and
//!   the stream stops as soon as its cancellation token fires
//! - **Incomplete entries**: a chunk key missing either its config or its
//!   checksum payload is skipped by [`ConfigChunk::entries`]
//! - **Shared connections**: both stores are safe for concurrent use by every
//!   worker of every object type

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{ExecRecord, MemoryConfigStore, MemoryRelationalStore};
pub use sqlite::SqliteStore;
pub use traits::{ConfigChunk, ConfigStore, RelationalStore};

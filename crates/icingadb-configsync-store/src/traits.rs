//! Store traits: the interfaces of the key/value and relational collaborators.

use async_trait::async_trait;
use icingadb_configsync_core::{
    BulkDeleteStmt, BulkInsertStmt, BulkUpdateStmt, Checksum, ObjectType, Value,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// A batch of `(key, config, checksums)` triples fetched together.
///
/// `configs[i]` and `checksums[i]` belong to `keys[i]`; either may be absent
/// when the object was deleted concurrently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigChunk {
    pub keys: Vec<String>,
    pub configs: Vec<Option<String>>,
    pub checksums: Vec<Option<String>>,
}

impl ConfigChunk {
    /// Complete entries only, as `(key, config, checksums)`.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &str)> + '_ {
        self.keys.iter().enumerate().filter_map(|(i, key)| {
            let config = self.configs.get(i)?.as_deref()?;
            let checksums = self.checksums.get(i)?.as_deref()?;
            Some((key.as_str(), config, checksums))
        })
    }

    /// Number of keys requested in this chunk, complete or not.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// The key/value store holding authoritative config state.
///
/// Implementations must be safe for concurrent use.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// All field names of the hash `set_name`, i.e. the known object IDs.
    async fn list_keys(&self, set_name: &str) -> Result<Vec<String>>;

    /// Stream the config and checksum payloads of `ids` in chunks.
    ///
    /// The stream is finite and not restartable. It ends early once `cancel`
    /// fires or the receiver is dropped. A failed chunk is sent as `Err` and
    /// ends the stream.
    fn fetch_config_chunks(
        &self,
        cancel: CancellationToken,
        ids: Vec<String>,
        object_type: &ObjectType,
        chunk_size: usize,
    ) -> mpsc::Receiver<Result<ConfigChunk>>;
}

/// The relational store the engine writes to.
///
/// Implementations must be safe for concurrent use and pool internally.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Hex form of every binary ID in `table`.
    async fn fetch_all_ids(&self, table: &str) -> Result<Vec<String>>;

    /// Insert (or replace) rows, each bound by [`BulkInsertStmt::bind`].
    ///
    /// Returns the number of affected rows.
    async fn bulk_insert(&self, stmt: &BulkInsertStmt, rows: Vec<Vec<Value>>) -> Result<usize>;

    /// Update rows, each bound by [`BulkUpdateStmt::bind`] (ID last).
    async fn bulk_update(&self, stmt: &BulkUpdateStmt, rows: Vec<Vec<Value>>) -> Result<usize>;

    /// Delete rows by binary ID.
    async fn bulk_delete(&self, stmt: &BulkDeleteStmt, ids: Vec<Checksum>) -> Result<usize>;
}

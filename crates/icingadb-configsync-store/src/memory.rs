//! In-memory implementations of the store traits.
//!
//! These are primarily for testing. [`MemoryConfigStore`] mimics the
//! hash-of-hashes layout of the real key/value store, [`MemoryRelationalStore`]
//! keeps one map per table keyed by binary ID and records every statement it
//! executes.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use icingadb_configsync_core::{
    BulkDeleteStmt, BulkInsertStmt, BulkUpdateStmt, Checksum, ObjectType, Operation, Value,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, StoreError};
use crate::traits::{ConfigChunk, ConfigStore, RelationalStore};

/// In-memory key/value store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Clone, Default)]
pub struct MemoryConfigStore {
    inner: Arc<MemoryConfigInner>,
}

#[derive(Default)]
struct MemoryConfigInner {
    /// Hash name -> field -> value.
    hashes: RwLock<HashMap<String, BTreeMap<String, String>>>,
    fail_list: AtomicBool,
    fail_fetch: AtomicBool,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a hash field.
    pub fn hset(&self, key: &str, field: &str, value: &str) {
        let mut hashes = self.inner.hashes.write().unwrap();
        hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
    }

    /// Remove a hash field.
    pub fn hdel(&self, key: &str, field: &str) {
        let mut hashes = self.inner.hashes.write().unwrap();
        if let Some(hash) = hashes.get_mut(key) {
            hash.remove(field);
        }
    }

    /// Store both payloads of one object.
    pub fn put_object(&self, object_type: &ObjectType, id: &str, config: &str, checksums: &str) {
        self.hset(&object_type.config_key(), id, config);
        self.hset(&object_type.checksum_key(), id, checksums);
    }

    /// Remove both payloads of one object.
    pub fn remove_object(&self, object_type: &ObjectType, id: &str) {
        self.hdel(&object_type.config_key(), id);
        self.hdel(&object_type.checksum_key(), id);
    }

    /// Make every `list_keys` call fail.
    pub fn set_fail_list_keys(&self, fail: bool) {
        self.inner.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Make every chunk fetch fail.
    pub fn set_fail_fetch(&self, fail: bool) {
        self.inner.fail_fetch.store(fail, Ordering::SeqCst);
    }

    fn hmget(&self, key: &str, fields: &[String]) -> Vec<Option<String>> {
        let hashes = self.inner.hashes.read().unwrap();
        let hash = hashes.get(key);
        fields
            .iter()
            .map(|f| hash.and_then(|h| h.get(f).cloned()))
            .collect()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn list_keys(&self, set_name: &str) -> Result<Vec<String>> {
        if self.inner.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::KeyValue(format!("HKEYS {}", set_name)));
        }
        let hashes = self.inner.hashes.read().unwrap();
        Ok(hashes
            .get(set_name)
            .map(|h| h.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn fetch_config_chunks(
        &self,
        cancel: CancellationToken,
        ids: Vec<String>,
        object_type: &ObjectType,
        chunk_size: usize,
    ) -> mpsc::Receiver<Result<ConfigChunk>> {
        let (tx, rx) = mpsc::channel(1);
        let store = self.clone();
        let config_key = object_type.config_key();
        let checksum_key = object_type.checksum_key();
        let chunk_size = chunk_size.max(1);

        tokio::spawn(async move {
            for keys in ids.chunks(chunk_size) {
                if cancel.is_cancelled() {
                    break;
                }

                let chunk = if store.inner.fail_fetch.load(Ordering::SeqCst) {
                    Err(StoreError::KeyValue(format!("HMGET {}", config_key)))
                } else {
                    Ok(ConfigChunk {
                        keys: keys.to_vec(),
                        configs: store.hmget(&config_key, keys),
                        checksums: store.hmget(&checksum_key, keys),
                    })
                };
                let failed = chunk.is_err();

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = tx.send(chunk) => {
                        if sent.is_err() || failed {
                            break;
                        }
                    }
                }
            }
        });

        rx
    }
}

/// One statement executed by [`MemoryRelationalStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRecord {
    pub operation: Operation,
    pub table: String,
    pub rows: usize,
}

/// In-memory relational store.
#[derive(Default)]
pub struct MemoryRelationalStore {
    /// Table -> binary ID -> full value list (ID first).
    tables: RwLock<HashMap<String, BTreeMap<Checksum, Vec<Value>>>>,
    executed: Mutex<Vec<ExecRecord>>,
    fail_fetch: AtomicBool,
    fail_exec: AtomicBool,
    exec_delay: Mutex<Option<Duration>>,
}

impl MemoryRelationalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert bare rows holding only their ID.
    pub fn seed(&self, table: &str, ids: &[Checksum]) {
        let mut tables = self.tables.write().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        for id in ids {
            rows.insert(*id, vec![Value::Binary(*id)]);
        }
    }

    /// Binary IDs currently in `table`.
    pub fn ids(&self, table: &str) -> BTreeSet<Checksum> {
        let tables = self.tables.read().unwrap();
        tables
            .get(table)
            .map(|rows| rows.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Stored values of one row.
    pub fn row(&self, table: &str, id: &Checksum) -> Option<Vec<Value>> {
        let tables = self.tables.read().unwrap();
        tables.get(table).and_then(|rows| rows.get(id).cloned())
    }

    /// Every statement executed so far.
    pub fn executed(&self) -> Vec<ExecRecord> {
        self.executed.lock().unwrap().clone()
    }

    /// Total rows passed to statements of `operation` on `table`.
    pub fn executed_rows(&self, table: &str, operation: Operation) -> usize {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.table == table && r.operation == operation)
            .map(|r| r.rows)
            .sum()
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_exec(&self, fail: bool) {
        self.fail_exec.store(fail, Ordering::SeqCst);
    }

    /// Delay every bulk statement, simulating a slow database.
    pub fn set_exec_delay(&self, delay: Option<Duration>) {
        *self.exec_delay.lock().unwrap() = delay;
    }

    async fn before_exec(&self, operation: Operation, table: &str, rows: usize) -> Result<()> {
        let delay = *self.exec_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_exec.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("{} on {}", operation, table)));
        }
        self.executed.lock().unwrap().push(ExecRecord {
            operation,
            table: table.to_string(),
            rows,
        });
        Ok(())
    }
}

fn row_id(values: &[Value], at: usize) -> Result<Checksum> {
    values
        .get(at)
        .and_then(Value::as_checksum)
        .copied()
        .ok_or_else(|| StoreError::InvalidData(format!("parameter {} is not a binary ID", at)))
}

#[async_trait]
impl RelationalStore for MemoryRelationalStore {
    async fn fetch_all_ids(&self, table: &str) -> Result<Vec<String>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("SELECT id FROM {}", table)));
        }
        Ok(self.ids(table).iter().map(Checksum::to_hex).collect())
    }

    async fn bulk_insert(&self, stmt: &BulkInsertStmt, rows: Vec<Vec<Value>>) -> Result<usize> {
        self.before_exec(Operation::Insert, stmt.table(), rows.len())
            .await?;

        let mut tables = self.tables.write().unwrap();
        let table = tables.entry(stmt.table().to_string()).or_default();
        let count = rows.len();
        for values in rows {
            let id = row_id(&values, 0)?;
            table.insert(id, values);
        }
        Ok(count)
    }

    async fn bulk_update(&self, stmt: &BulkUpdateStmt, rows: Vec<Vec<Value>>) -> Result<usize> {
        self.before_exec(Operation::Update, stmt.table(), rows.len())
            .await?;

        let mut tables = self.tables.write().unwrap();
        let table = tables.entry(stmt.table().to_string()).or_default();
        let mut affected = 0;
        for mut values in rows {
            let id = row_id(&values, values.len().saturating_sub(1))?;
            if let Some(stored) = table.get_mut(&id) {
                values.pop();
                stored.truncate(1);
                stored.extend(values);
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn bulk_delete(&self, stmt: &BulkDeleteStmt, ids: Vec<Checksum>) -> Result<usize> {
        self.before_exec(Operation::Delete, stmt.table(), ids.len())
            .await?;

        let mut tables = self.tables.write().unwrap();
        let Some(table) = tables.get_mut(stmt.table()) else {
            return Ok(0);
        };
        Ok(ids.iter().filter(|id| table.remove(id).is_some()).count())
    }
}

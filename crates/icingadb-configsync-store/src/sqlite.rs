//! SQLite implementation of [`RelationalStore`].
//!
//! Uses rusqlite with bundled SQLite, wrapped in async via
//! `tokio::task::spawn_blocking`. Each bulk call runs in one transaction.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use icingadb_configsync_core::{
    objects, BulkDeleteStmt, BulkInsertStmt, BulkUpdateStmt, Checksum, Value,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::RelationalStore;

/// Bind parameter limit of the bundled SQLite build (conservative).
pub const MAX_PARAMS: usize = 999;

/// SQLite-based relational store.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` on the connection in a blocking task.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Stored values of one row, in column order.
    pub async fn row_values(&self, table: &str, id: &Checksum) -> Result<Option<Vec<Value>>> {
        let table = checked_table(table)?;
        let id = *id;
        self.blocking(move |conn| {
            let sql = format!("SELECT * FROM {} WHERE id = ?1", table);
            let mut stmt = conn.prepare(&sql)?;
            let columns = stmt.column_count();
            let row = stmt
                .query_row([id.as_bytes().as_slice()], |row| {
                    (0..columns)
                        .map(|i| row.get::<_, SqlValue>(i))
                        .collect::<rusqlite::Result<Vec<_>>>()
                })
                .optional()?;
            row.map(|values| {
                values
                    .into_iter()
                    .map(from_sql_value)
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()
        })
        .await
    }
}

/// Only tables of known object types may be interpolated into SQL.
fn checked_table(table: &str) -> Result<&'static str> {
    Ok(objects::by_name(table)?.table())
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Binary(c) => SqlValue::Blob(c.as_bytes().to_vec()),
        Value::Real(f) => SqlValue::Real(*f),
    }
}

fn from_sql_value(value: SqlValue) -> Result<Value> {
    Ok(match value {
        SqlValue::Null => Value::Null,
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Blob(b) => Value::Binary(Checksum::try_from(b.as_slice())?),
        SqlValue::Real(f) => Value::Real(f),
        SqlValue::Integer(i) => Value::Real(i as f64),
    })
}

#[async_trait]
impl RelationalStore for SqliteStore {
    async fn fetch_all_ids(&self, table: &str) -> Result<Vec<String>> {
        let table = checked_table(table)?;
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!("SELECT id FROM {}", table))?;
            let ids = stmt
                .query_map([], |row| row.get::<_, Vec<u8>>(0))?
                .map(|id| id.map(hex::encode).map_err(StoreError::from))
                .collect::<Result<Vec<_>>>()?;
            Ok(ids)
        })
        .await
    }

    async fn bulk_insert(&self, stmt: &BulkInsertStmt, rows: Vec<Vec<Value>>) -> Result<usize> {
        checked_table(stmt.table())?;
        let stmt = stmt.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let mut affected = 0;
            for chunk in rows.chunks(stmt.max_rows_per_statement(MAX_PARAMS)) {
                let mut prepared = tx.prepare_cached(&stmt.sql(chunk.len()))?;
                affected += prepared.execute(params_from_iter(
                    chunk.iter().flatten().map(to_sql_value),
                ))?;
            }
            tx.commit()?;
            Ok(affected)
        })
        .await
    }

    async fn bulk_update(&self, stmt: &BulkUpdateStmt, rows: Vec<Vec<Value>>) -> Result<usize> {
        checked_table(stmt.table())?;
        let stmt = stmt.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let mut affected = 0;
            {
                let mut prepared = tx.prepare_cached(stmt.sql())?;
                for row in &rows {
                    affected += prepared.execute(params_from_iter(row.iter().map(to_sql_value)))?;
                }
            }
            tx.commit()?;
            Ok(affected)
        })
        .await
    }

    async fn bulk_delete(&self, stmt: &BulkDeleteStmt, ids: Vec<Checksum>) -> Result<usize> {
        checked_table(stmt.table())?;
        let stmt = stmt.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let mut affected = 0;
            for chunk in ids.chunks(MAX_PARAMS) {
                let mut prepared = tx.prepare_cached(&stmt.sql(chunk.len()))?;
                affected += prepared.execute(params_from_iter(
                    chunk.iter().map(|id| id.as_bytes().to_vec()),
                ))?;
            }
            tx.commit()?;
            Ok(affected)
        })
        .await
    }
}

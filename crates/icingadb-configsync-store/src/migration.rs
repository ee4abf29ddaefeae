//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1. Only the tables written
//! by the sync engine are created here.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
            tracing::info!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: host and hostgroup tables.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE host (
            id BLOB PRIMARY KEY,              -- sha1 of the object identifier
            env_id BLOB NOT NULL,
            name_checksum BLOB,
            properties_checksum BLOB,
            customvars_checksum BLOB,
            groups_checksum BLOB,
            name TEXT NOT NULL,
            name_ci TEXT NOT NULL,
            display_name TEXT NOT NULL,
            address TEXT NOT NULL,
            address6 TEXT NOT NULL,
            address_bin TEXT NOT NULL,
            address6_bin TEXT NOT NULL,
            checkcommand TEXT NOT NULL,
            checkcommand_id BLOB,
            max_check_attempts REAL NOT NULL,
            check_period TEXT NOT NULL,
            check_period_id BLOB,
            check_timeout REAL NOT NULL,
            check_interval REAL NOT NULL,
            check_retry_interval REAL NOT NULL,
            active_checks_enabled TEXT NOT NULL CHECK (active_checks_enabled IN ('y', 'n')),
            passive_checks_enabled TEXT NOT NULL CHECK (passive_checks_enabled IN ('y', 'n')),
            event_handler_enabled TEXT NOT NULL CHECK (event_handler_enabled IN ('y', 'n')),
            notifications_enabled TEXT NOT NULL CHECK (notifications_enabled IN ('y', 'n')),
            flapping_enabled TEXT NOT NULL CHECK (flapping_enabled IN ('y', 'n')),
            flapping_threshold_low REAL NOT NULL,
            flapping_threshold_high REAL NOT NULL,
            perfdata_enabled TEXT NOT NULL CHECK (perfdata_enabled IN ('y', 'n')),
            eventcommand TEXT NOT NULL,
            eventcommand_id BLOB,
            is_volatile TEXT NOT NULL CHECK (is_volatile IN ('y', 'n')),
            action_url_id BLOB,
            notes_url_id BLOB,
            notes TEXT NOT NULL,
            icon_image_id BLOB,
            icon_image_alt TEXT NOT NULL,
            zone TEXT NOT NULL,
            zone_id BLOB,
            command_endpoint TEXT NOT NULL,
            command_endpoint_id BLOB
        );

        CREATE TABLE hostgroup (
            id BLOB PRIMARY KEY,
            env_id BLOB NOT NULL,
            name_checksum BLOB,
            properties_checksum BLOB,
            customvars_checksum BLOB,
            name TEXT NOT NULL,
            name_ci TEXT NOT NULL,
            display_name TEXT NOT NULL,
            zone_id BLOB
        );

        CREATE INDEX idx_host_name_ci ON host(name_ci);
        CREATE INDEX idx_hostgroup_name_ci ON hostgroup(name_ci);
        "#,
    )?;

    Ok(())
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

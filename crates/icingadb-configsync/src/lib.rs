//! # Icinga DB Config Sync
//!
//! Keeps a relational store's config object tables equal to the
//! authoritative key/value store, writing only while this instance holds HA
//! responsibility.
//!
//! ## Overview
//!
//! - **Object types**: hosts and host groups, each with a fixed column list
//!   and a row factory supplying defaults
//! - **Delta**: on acquiring responsibility, every ID is classified as
//!   insert, update or delete by comparing both stores once
//! - **Pipeline**: payloads are fetched in chunks, decoded by a shared pool
//!   and written with bulk statements
//! - **Fail-fast**: the first fetch or write error stops the engine
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use icingadb_configsync::{Engine, EngineConfig};
//! use icingadb_configsync::store::MemoryConfigStore;
//! use icingadb_configsync::sync::{HaNotification, HaNotifier};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = EngineConfig::load("icingadb.toml")?;
//!     let database = Arc::new(config.database.open()?);
//!     let ha = Arc::new(HaNotifier::new());
//!
//!     let engine = Engine::new(
//!         config,
//!         Arc::new(MemoryConfigStore::new()),
//!         database,
//!         ha.clone(),
//!     )?;
//!     let running = engine.start();
//!
//!     ha.notify(HaNotification::IsResponsible);
//!     running.wait().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `icingadb_configsync::core` - Checksums, rows, object types, delta
//! - `icingadb_configsync::store` - Store traits, in-memory and SQLite stores
//! - `icingadb_configsync::sync` - Operators, decode pool, HA notifications

pub mod config;
pub mod engine;
pub mod error;

pub use icingadb_configsync_core as core;
pub use icingadb_configsync_store as store;
pub use icingadb_configsync_sync as sync;

pub use config::{DatabaseConfig, EngineConfig};
pub use engine::{Engine, RunningEngine};
pub use error::{EngineError, Result};

pub use icingadb_configsync_core::{checksum, delta, Checksum, Delta, ObjectType, Operation};
pub use icingadb_configsync_sync::{
    HaNotification, HaNotifier, OperatorHandle, OperatorState, SyncConfig, SyncError,
};

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_filter))
        .map_err(|e| EngineError::Config(e.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| EngineError::Config(e.to_string()))
}

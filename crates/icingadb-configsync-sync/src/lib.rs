//! # Icinga DB Config Sync Engine
//!
//! HA-gated pipeline keeping the relational store in sync with the key/value
//! store, one [`Operator`] per object type.
//!
//! ## Overview
//!
//! Only the instance holding HA responsibility may write. Each Operator
//! listens for [`HaNotification`]s. On `IsResponsible` it computes the
//! [`Delta`](icingadb_configsync_core::Delta) between both stores once and
//! starts a pipeline; on `IsNotResponsible` it stops that pipeline and waits
//! for its workers to finish.
//!
//! ## Pipeline
//!
//! ```text
//!             ┌────────── insert keys ──> prep ──┐
//! Operator ───┼────────── update keys ──> prep ──┼──> decode pool ──> exec insert / exec update
//!             └────────── delete keys ───────────┴──────────────────> exec delete
//! ```
//!
//! Every stage talks through channels. Fetch and bulk-exec failures go to the
//! central [`ErrorSink`]; a malformed payload only drops its own row.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use icingadb_configsync_core::objects::HOST;
//! use icingadb_configsync_store::{MemoryConfigStore, SqliteStore};
//! use icingadb_configsync_sync::{
//!     DecodePool, ErrorSink, HaNotification, HaNotifier, Operator, Supervisor, SyncConfig,
//! };
//!
//! async fn example() {
//!     let config = SyncConfig::default();
//!     let (decoder, _pool) = DecodePool::spawn(config.decode_workers, config.channel_capacity);
//!     let (errors, mut error_rx) = ErrorSink::channel();
//!     let supervisor = Supervisor {
//!         config_store: Arc::new(MemoryConfigStore::new()),
//!         relational_store: Arc::new(SqliteStore::open_memory().unwrap()),
//!         decoder,
//!         errors,
//!     };
//!
//!     let ha = HaNotifier::new();
//!     let (operator, _handle) = Operator::new(HOST, supervisor, config);
//!     tokio::spawn(operator.run(ha.register_notification_listener()));
//!
//!     ha.notify(HaNotification::IsResponsible);
//!     if let Some(err) = error_rx.recv().await {
//!         panic!("sync failed: {}", err);
//!     }
//! }
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod ha;
pub mod operator;
pub mod progress;
pub mod supervisor;
mod workers;

pub use config::SyncConfig;
pub use decode::{DecodePackage, DecodePackages, DecodePool, DecodePoolHandle, DecodedBatch};
pub use error::{Result, StoreSide, SyncError};
pub use ha::{HaNotification, HaNotifier};
pub use operator::{Operator, OperatorHandle, OperatorState};
pub use progress::Progress;
pub use supervisor::{ErrorSink, Supervisor};

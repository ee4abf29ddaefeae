//! # Icinga DB Config Sync Testkit
//!
//! Testing utilities for the config sync engine.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Checksum vectors**: Known object IDs with their expected SHA-1 checksums
//! - **Generators**: Proptest strategies for ID sets and object payloads
//! - **Fixtures**: In-memory stores and an HA notifier wired up for a test
//!
//! ## Checksum Vectors
//!
//! ```rust
//! use icingadb_configsync_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok, actual) in verify_all_vectors() {
//!     assert!(ok, "{}: got {}", name, actual);
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use icingadb_configsync_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! fixture.put_hosts(&["h1", "h2", "h3"]);
//! fixture.seed_hosts(&["h2", "h4"]);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{host_checksums, host_config, TestFixture};
pub use generators::{HostParams, StoreSplit};
pub use vectors::{all_vectors, verify_all_vectors, ChecksumVector};

//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use icingadb_configsync_core::objects::{HOST, HOSTGROUP};
use icingadb_configsync_core::{checksum, Checksum, ObjectType};
use icingadb_configsync_store::{ConfigStore, MemoryConfigStore, MemoryRelationalStore};
use icingadb_configsync_sync::HaNotifier;

/// Config payload of a host named `name`.
pub fn host_config(name: &str) -> String {
    serde_json::json!({
        "name": name,
        "display_name": name,
        "address": "127.0.0.1",
        "checkcommand": "hostalive",
        "zone": "master",
        "zone_id": checksum("master").to_hex(),
    })
    .to_string()
}

/// Checksum payload matching `config`.
pub fn host_checksums(name: &str, config: &str) -> String {
    serde_json::json!({
        "name_checksum": checksum(name).to_hex(),
        "properties_checksum": checksum(config).to_hex(),
    })
    .to_string()
}

/// In-memory key/value and relational stores plus an HA notifier.
pub struct TestFixture {
    pub kv: MemoryConfigStore,
    pub db: Arc<MemoryRelationalStore>,
    pub ha: Arc<HaNotifier>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            kv: MemoryConfigStore::new(),
            db: Arc::new(MemoryRelationalStore::new()),
            ha: Arc::new(HaNotifier::new()),
        }
    }

    /// The key/value store as a trait object.
    pub fn config_store(&self) -> Arc<dyn ConfigStore> {
        Arc::new(self.kv.clone())
    }

    /// Store complete host payloads.
    pub fn put_hosts(&self, names: &[&str]) {
        for name in names {
            let config = host_config(name);
            self.kv
                .put_object(&HOST, name, &config, &host_checksums(name, &config));
        }
    }

    /// Store complete host group payloads.
    pub fn put_hostgroups(&self, names: &[&str]) {
        for name in names {
            let config = serde_json::json!({ "name": name, "display_name": name }).to_string();
            self.kv
                .put_object(&HOSTGROUP, name, &config, &host_checksums(name, &config));
        }
    }

    /// Seed the relational host table with bare rows.
    pub fn seed_hosts(&self, names: &[&str]) {
        self.seed(&HOST, names);
    }

    pub fn seed(&self, object_type: &ObjectType, names: &[&str]) {
        let ids: Vec<Checksum> = names.iter().map(|name| checksum(name)).collect();
        self.db.seed(object_type.table(), &ids);
    }

    /// Sorted binary IDs of `names`.
    pub fn ids(names: &[&str]) -> Vec<Checksum> {
        let mut ids: Vec<Checksum> = names.iter().map(|name| checksum(name)).collect();
        ids.sort();
        ids
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

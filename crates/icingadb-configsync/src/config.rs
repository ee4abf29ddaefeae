//! Engine configuration, loadable from TOML.
//!
//! ```toml
//! object_types = ["host", "hostgroup"]
//!
//! [database]
//! path = "/var/lib/icingadb/config.db"
//!
//! [sync]
//! decode_workers = 8
//! batch_size = 1000
//! ```
//!
//! Every key is optional.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use icingadb_configsync_core::{objects, ObjectType};
use icingadb_configsync_store::SqliteStore;
use icingadb_configsync_sync::SyncConfig;
use serde::Deserialize;

use crate::error::{EngineError, Result};

/// Where the relational store lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file. `None` keeps everything in memory.
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Open the configured store, creating its tables if needed.
    pub fn open(&self) -> Result<SqliteStore> {
        let store = match &self.path {
            Some(path) => SqliteStore::open(path)?,
            None => SqliteStore::open_memory()?,
        };
        Ok(store)
    }
}

/// Configuration for the [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pipeline tuning.
    pub sync: SyncConfig,
    /// Relational store location.
    pub database: DatabaseConfig,
    /// Object types to sync, one Operator each.
    pub object_types: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            database: DatabaseConfig::default(),
            object_types: objects::all().iter().map(|t| t.name.to_string()).collect(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("failed to load {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.sync
            .validate()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        if self.object_types.is_empty() {
            return Err(EngineError::Config("no object types configured".into()));
        }
        let mut seen = HashSet::new();
        for name in &self.object_types {
            if !seen.insert(name.as_str()) {
                return Err(EngineError::Config(format!("duplicate object type {}", name)));
            }
        }
        self.resolve_object_types().map(|_| ())
    }

    /// Look up every configured object type.
    pub fn resolve_object_types(&self) -> Result<Vec<ObjectType>> {
        self.object_types
            .iter()
            .map(|name| objects::by_name(name).map_err(EngineError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    #[test]
    fn test_default_syncs_all_types() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        let names: Vec<_> = config
            .resolve_object_types()
            .unwrap()
            .iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["host", "hostgroup"]);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = EngineConfig::from_toml_str(
            r#"
            object_types = ["host"]

            [sync]
            batch_size = 100
            reconcile_updates = false
            "#,
        )
        .unwrap();
        assert_eq!(config.object_types, vec!["host".to_string()]);
        assert_eq!(config.sync.batch_size, 100);
        assert!(!config.sync.reconcile_updates);
        assert_eq!(config.sync.decode_workers, 16);
        assert_eq!(config.database.path, None);
    }

    #[test]
    fn test_unknown_object_type_rejected() {
        let err = EngineConfig::from_toml_str(r#"object_types = ["service"]"#).unwrap_err();
        assert!(matches!(err, EngineError::Core(_)));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = EngineConfig::from_toml_str("[sync]\ndecode_workers = 0").unwrap_err();
        assert!(matches!(err, EngineError::Config(ref msg) if msg.contains("decode_workers")));
    }

    #[test]
    fn test_duplicate_object_type_rejected() {
        let err = EngineConfig::from_toml_str(r#"object_types = ["host", "host"]"#).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database]\npath = \"config.db\"").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.database.path, Some(PathBuf::from("config.db")));
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load("/nonexistent/icingadb.toml").unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    proptest! {
        #[test]
        fn test_sizes_from_toml(batch in 1usize..100_000, workers in 1usize..256) {
            let text = format!("[sync]\nbatch_size = {}\ndecode_workers = {}", batch, workers);
            let config = EngineConfig::from_toml_str(&text).unwrap();
            prop_assert_eq!(config.sync.batch_size, batch);
            prop_assert_eq!(config.sync.decode_workers, workers);
        }
    }

    #[test]
    fn test_open_memory_database() {
        assert!(DatabaseConfig::default().open().is_ok());
    }
}

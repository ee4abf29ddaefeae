//! Proptest generators for property-based testing.

use std::collections::BTreeSet;

use proptest::prelude::*;

/// Generate an object name.
pub fn object_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9.-]{0,31}".prop_map(String::from)
}

/// Generate a set of object names.
pub fn name_set(max_len: usize) -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(object_name(), 0..=max_len)
}

/// Generate a 40 character hex checksum.
pub fn checksum_hex() -> impl Strategy<Value = String> {
    "[0-9a-f]{40}".prop_map(String::from)
}

/// Names present in the key/value store, the relational store, or both.
#[derive(Debug, Clone)]
pub struct StoreSplit {
    pub kv_only: BTreeSet<String>,
    pub both: BTreeSet<String>,
    pub sql_only: BTreeSet<String>,
}

impl StoreSplit {
    pub fn kv(&self) -> Vec<String> {
        self.kv_only.iter().chain(&self.both).cloned().collect()
    }

    pub fn sql(&self) -> Vec<String> {
        self.both.iter().chain(&self.sql_only).cloned().collect()
    }
}

impl Arbitrary for StoreSplit {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        // each name lands in exactly one bucket
        prop::collection::btree_map(object_name(), 0u8..3, 0..=40)
            .prop_map(|names| {
                let mut split = StoreSplit {
                    kv_only: BTreeSet::new(),
                    both: BTreeSet::new(),
                    sql_only: BTreeSet::new(),
                };
                for (name, bucket) in names {
                    match bucket {
                        0 => split.kv_only.insert(name),
                        1 => split.both.insert(name),
                        _ => split.sql_only.insert(name),
                    };
                }
                split
            })
            .boxed()
    }
}

/// Parameters for a host payload.
#[derive(Debug, Clone)]
pub struct HostParams {
    pub name: String,
    pub display_name: String,
    pub check_interval: f32,
    pub active_checks_enabled: bool,
    pub zone_id: Option<String>,
}

impl HostParams {
    /// Config payload as stored in the key/value store.
    pub fn config(&self) -> String {
        let mut config = serde_json::json!({
            "name": self.name,
            "display_name": self.display_name,
            "check_interval": self.check_interval,
            "active_checks_enabled": self.active_checks_enabled,
        });
        if let Some(zone_id) = &self.zone_id {
            config["zone_id"] = serde_json::Value::String(zone_id.clone());
        }
        config.to_string()
    }
}

impl Arbitrary for HostParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            object_name(),
            "[ -~]{0,64}",
            1.0f32..86400.0f32,
            any::<bool>(),
            proptest::option::of(checksum_hex()),
        )
            .prop_map(|(name, display_name, check_interval, active, zone_id)| HostParams {
                name,
                display_name,
                check_interval,
                active_checks_enabled: active,
                zone_id,
            })
            .boxed()
    }
}

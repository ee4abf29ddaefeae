//! Host group objects.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::checksum::checksum;
use crate::error::Result;
use crate::row::{populate_from, Row};
use crate::value::Value;

/// Column order of the `hostgroup` table.
pub const FIELDS: &[&str] = &[
    "id",
    "env_id",
    "name_checksum",
    "properties_checksum",
    "customvars_checksum",
    "name",
    "name_ci",
    "display_name",
    "zone_id",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hostgroup {
    pub id: String,
    pub env_id: String,
    pub name_checksum: String,
    pub properties_checksum: String,
    pub customvars_checksum: String,
    pub name: String,
    pub name_ci: Option<String>,
    pub display_name: String,
    pub zone_id: String,
}

impl Default for Hostgroup {
    fn default() -> Self {
        Self {
            id: String::new(),
            env_id: checksum("default").to_hex(),
            name_checksum: String::new(),
            properties_checksum: String::new(),
            customvars_checksum: String::new(),
            name: String::new(),
            name_ci: None,
            display_name: String::new(),
            zone_id: String::new(),
        }
    }
}

/// Factory for host group rows.
pub fn new_hostgroup() -> Box<dyn Row> {
    Box::<Hostgroup>::default()
}

impl Row for Hostgroup {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn update_values(&self) -> Result<Vec<Value>> {
        Ok(vec![
            Value::checksum(&self.env_id)?,
            Value::reference(&self.name_checksum)?,
            Value::reference(&self.properties_checksum)?,
            Value::reference(&self.customvars_checksum)?,
            Value::text(&self.name),
            Value::text(self.name_ci.as_deref().unwrap_or(&self.name)),
            Value::text(&self.display_name),
            Value::reference(&self.zone_id)?,
        ])
    }

    fn populate(&mut self, fields: Map<String, Json>) -> serde_json::Result<()> {
        populate_from(self, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostgroup_values() {
        let mut group = new_hostgroup();
        group.set_id("linux-servers".into());
        let fields = serde_json::json!({
            "name": "linux-servers",
            "display_name": "Linux Servers",
            "name_checksum": checksum("linux-servers").to_hex(),
        });
        group.populate(fields.as_object().unwrap().clone()).unwrap();

        let values = group.insert_values().unwrap();
        assert_eq!(values.len(), FIELDS.len());
        assert_eq!(values[0], Value::Binary(checksum("linux-servers")));
        assert_eq!(values[2], Value::Binary(checksum("linux-servers")));
        assert_eq!(values[7], Value::text("Linux Servers"));
        assert!(values[8].is_null());
    }
}

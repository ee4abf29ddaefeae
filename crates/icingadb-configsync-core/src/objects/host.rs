//! Host objects.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::checksum::{checksum, storage_bool};
use crate::error::Result;
use crate::row::{populate_from, Row};
use crate::value::Value;

/// Column order of the `host` table.
pub const FIELDS: &[&str] = &[
    "id",
    "env_id",
    "name_checksum",
    "properties_checksum",
    "customvars_checksum",
    "groups_checksum",
    "name",
    "name_ci",
    "display_name",
    "address",
    "address6",
    "address_bin",
    "address6_bin",
    "checkcommand",
    "checkcommand_id",
    "max_check_attempts",
    "check_period",
    "check_period_id",
    "check_timeout",
    "check_interval",
    "check_retry_interval",
    "active_checks_enabled",
    "passive_checks_enabled",
    "event_handler_enabled",
    "notifications_enabled",
    "flapping_enabled",
    "flapping_threshold_low",
    "flapping_threshold_high",
    "perfdata_enabled",
    "eventcommand",
    "eventcommand_id",
    "is_volatile",
    "action_url_id",
    "notes_url_id",
    "notes",
    "icon_image_id",
    "icon_image_alt",
    "zone",
    "zone_id",
    "command_endpoint",
    "command_endpoint_id",
];

/// A monitored host.
///
/// Checksum and `*_id` columns hold 40-character hex strings; they are decoded
/// to binary when the value list is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Host {
    pub id: String,
    pub env_id: String,
    pub name_checksum: String,
    pub properties_checksum: String,
    pub customvars_checksum: String,
    pub groups_checksum: String,
    pub name: String,
    /// Case-insensitive name; follows `name` when unset.
    pub name_ci: Option<String>,
    pub display_name: String,
    pub address: String,
    pub address6: String,
    pub address_bin: String,
    pub address6_bin: String,
    pub checkcommand: String,
    pub checkcommand_id: String,
    pub max_check_attempts: f32,
    pub check_period: String,
    pub check_period_id: String,
    pub check_timeout: f32,
    pub check_interval: f32,
    pub check_retry_interval: f32,
    pub active_checks_enabled: bool,
    pub passive_checks_enabled: bool,
    pub event_handler_enabled: bool,
    pub notifications_enabled: bool,
    pub flapping_enabled: bool,
    pub flapping_threshold_low: f32,
    pub flapping_threshold_high: f32,
    pub perfdata_enabled: bool,
    pub eventcommand: String,
    pub eventcommand_id: String,
    pub is_volatile: bool,
    pub action_url_id: String,
    pub notes_url_id: String,
    pub notes: String,
    pub icon_image_id: String,
    pub icon_image_alt: String,
    pub zone: String,
    pub zone_id: String,
    pub command_endpoint: String,
    pub command_endpoint_id: String,
}

impl Default for Host {
    fn default() -> Self {
        Self {
            id: String::new(),
            env_id: checksum("default").to_hex(),
            name_checksum: String::new(),
            properties_checksum: String::new(),
            customvars_checksum: String::new(),
            groups_checksum: String::new(),
            name: String::new(),
            name_ci: None,
            display_name: String::new(),
            address: String::new(),
            address6: String::new(),
            address_bin: String::new(),
            address6_bin: String::new(),
            checkcommand: String::new(),
            checkcommand_id: String::new(),
            max_check_attempts: 0.0,
            check_period: "check_period".to_string(),
            check_period_id: checksum("check_period").to_hex(),
            check_timeout: 0.0,
            check_interval: 0.0,
            check_retry_interval: 0.0,
            active_checks_enabled: false,
            passive_checks_enabled: false,
            event_handler_enabled: false,
            notifications_enabled: false,
            flapping_enabled: false,
            flapping_threshold_low: 0.0,
            flapping_threshold_high: 0.0,
            perfdata_enabled: false,
            eventcommand: "event_command".to_string(),
            eventcommand_id: String::new(),
            is_volatile: false,
            action_url_id: String::new(),
            notes_url_id: String::new(),
            notes: String::new(),
            icon_image_id: String::new(),
            icon_image_alt: String::new(),
            zone: String::new(),
            zone_id: String::new(),
            command_endpoint: "command_endpoint".to_string(),
            command_endpoint_id: String::new(),
        }
    }
}

/// Factory for host rows.
pub fn new_host() -> Box<dyn Row> {
    Box::<Host>::default()
}

impl Row for Host {
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
            Value::reference(&self.groups_checksum)?,
            Value::text(&self.name),
            Value::text(self.name_ci.as_deref().unwrap_or(&self.name)),
            Value::text(&self.display_name),
            Value::text(&self.address),
            Value::text(&self.address6),
            Value::text(&self.address_bin),
            Value::text(&self.address6_bin),
            Value::text(&self.checkcommand),
            Value::reference(&self.checkcommand_id)?,
            Value::real(self.max_check_attempts),
            Value::text(&self.check_period),
            Value::reference(&self.check_period_id)?,
            Value::real(self.check_timeout),
            Value::real(self.check_interval),
            Value::real(self.check_retry_interval),
            storage_bool(self.active_checks_enabled),
            storage_bool(self.passive_checks_enabled),
            storage_bool(self.event_handler_enabled),
            storage_bool(self.notifications_enabled),
            storage_bool(self.flapping_enabled),
            Value::real(self.flapping_threshold_low),
            Value::real(self.flapping_threshold_high),
            storage_bool(self.perfdata_enabled),
            Value::text(&self.eventcommand),
            Value::reference(&self.eventcommand_id)?,
            storage_bool(self.is_volatile),
            Value::reference(&self.action_url_id)?,
            Value::reference(&self.notes_url_id)?,
            Value::text(&self.notes),
            Value::reference(&self.icon_image_id)?,
            Value::text(&self.icon_image_alt),
            Value::text(&self.zone),
            Value::reference(&self.zone_id)?,
            Value::text(&self.command_endpoint),
            Value::reference(&self.command_endpoint_id)?,
        ])
    }

    fn populate(&mut self, fields: Map<String, Json>) -> serde_json::Result<()> {
        populate_from(self, fields)
    }
}

//! Object types known to the sync engine.
//!
//! An object type is pure data: a table name, an ordered field list with the
//! primary ID first, and a factory producing default rows.

pub mod host;
pub mod hostgroup;

pub use host::Host;
pub use hostgroup::Hostgroup;

use std::fmt;

use crate::error::{CoreError, Result};
use crate::row::{Row, RowFactory};

/// Static description of one synchronizable object type.
#[derive(Clone, Copy)]
pub struct ObjectType {
    /// Type name, also the relational table name.
    pub name: &'static str,
    /// Ordered column list, `id` first.
    pub fields: &'static [&'static str],
    /// Constructor for rows with type defaults.
    pub factory: RowFactory,
}

impl ObjectType {
    /// Relational table this type is written to.
    pub fn table(&self) -> &'static str {
        self.name
    }

    /// Columns written by an update: every field but the ID.
    pub fn update_fields(&self) -> &'static [&'static str] {
        &self.fields[1..]
    }

    /// Key/value hash listing `id -> checksums` for existence checks.
    pub fn checksum_key(&self) -> String {
        format!("icinga:config:checksum:{}", self.name)
    }

    /// Key/value hash listing `id -> config` payloads.
    pub fn config_key(&self) -> String {
        format!("icinga:config:{}", self.name)
    }

    /// Create a default row of this type.
    pub fn new_row(&self) -> Box<dyn Row> {
        (self.factory)()
    }
}

impl PartialEq for ObjectType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ObjectType {}

impl fmt::Debug for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectType({})", self.name)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub const HOST: ObjectType = ObjectType {
    name: "host",
    fields: host::FIELDS,
    factory: host::new_host,
};

pub const HOSTGROUP: ObjectType = ObjectType {
    name: "hostgroup",
    fields: hostgroup::FIELDS,
    factory: hostgroup::new_hostgroup,
};

const ALL: &[ObjectType] = &[HOST, HOSTGROUP];

/// Every registered object type.
pub fn all() -> &'static [ObjectType] {
    ALL
}

/// Look up an object type by name.
pub fn by_name(name: &str) -> Result<ObjectType> {
    all()
        .iter()
        .copied()
        .find(|t| t.name == name)
        .ok_or_else(|| CoreError::UnknownObjectType(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_lists_start_with_id() {
        for object_type in all() {
            assert_eq!(object_type.fields[0], "id", "{}", object_type);
        }
    }

    #[test]
    fn test_factory_rows_match_field_lists() {
        for object_type in all() {
            let row = object_type.new_row();
            let values = row.insert_values().unwrap();
            assert_eq!(values.len(), object_type.fields.len(), "{}", object_type);
            assert_eq!(
                row.update_values().unwrap().len(),
                object_type.update_fields().len()
            );
        }
    }

    #[test]
    fn test_keys() {
        assert_eq!(HOST.checksum_key(), "icinga:config:checksum:host");
        assert_eq!(HOST.config_key(), "icinga:config:host");
    }

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("hostgroup").unwrap(), HOSTGROUP);
        assert!(matches!(
            by_name("service"),
            Err(CoreError::UnknownObjectType(_))
        ));
    }
}

//! The Row contract: the unit moved through the sync pipeline.
//!
//! Every object type implements [`Row`]. The pipeline only ever sees
//! `Box<dyn Row>`, created by the object type's [`RowFactory`], populated from
//! raw JSON by the decode stage and consumed once by an exec worker.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value as Json};

use crate::checksum::checksum;
use crate::error::Result;
use crate::value::Value;

/// Zero-argument constructor returning a row with type-appropriate defaults.
pub type RowFactory = fn() -> Box<dyn Row>;

/// A synchronizable config object.
pub trait Row: Send + Sync + fmt::Debug {
    /// The natural identifier of this object.
    fn id(&self) -> &str;

    /// Replace the natural identifier.
    fn set_id(&mut self, id: String);

    /// Values for every column except the ID, in field-list order.
    fn update_values(&self) -> Result<Vec<Value>>;

    /// Values for every column, ID first.
    ///
    /// Always `[checksum(id)] ++ update_values()`.
    fn insert_values(&self) -> Result<Vec<Value>> {
        let update = self.update_values()?;
        let mut values = Vec::with_capacity(update.len() + 1);
        values.push(Value::Binary(checksum(self.id())));
        values.extend(update);
        Ok(values)
    }

    /// Merge decoded JSON fields over the current (factory default) values.
    fn populate(&mut self, fields: Map<String, Json>) -> serde_json::Result<()>;
}

/// Merge `fields` over the serialized form of `target` and deserialize back.
///
/// Keys missing from `fields` and explicit nulls keep the current value, so
/// factory defaults survive partial payloads.
pub fn populate_from<T>(target: &mut T, fields: Map<String, Json>) -> serde_json::Result<()>
where
    T: Serialize + DeserializeOwned,
{
    let mut merged = match serde_json::to_value(&*target)? {
        Json::Object(map) => map,
        _ => Map::new(),
    };
    merged.extend(fields.into_iter().filter(|(_, v)| !v.is_null()));
    *target = serde_json::from_value(Json::Object(merged))?;
    Ok(())
}

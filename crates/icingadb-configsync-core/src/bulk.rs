//! Bulk statement descriptors.
//!
//! Descriptors are pure metadata assembled once per object type: table name,
//! field list and SQL shape. Building one never touches a database, and two
//! builds over the same field list are equal, so a single instance can be
//! shared by every worker.

use std::fmt;

use crate::checksum::checksum;
use crate::error::{CoreError, Result};
use crate::objects::ObjectType;
use crate::row::Row;
use crate::value::Value;

/// Kind of bulk write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batched insert over the full field list, ID first.
///
/// Uses `REPLACE INTO` so re-inserting a row with the same ID is idempotent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkInsertStmt {
    table: String,
    fields: Vec<String>,
    prefix: String,
    placeholders: String,
}

impl BulkInsertStmt {
    pub fn new(table: &str, fields: &[&str]) -> Self {
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        let prefix = format!("REPLACE INTO {} ({}) VALUES ", table, fields.join(", "));
        let placeholders = format!("({})", vec!["?"; fields.len()].join(", "));
        Self {
            table: table.to_string(),
            fields,
            prefix,
            placeholders,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// SQL text inserting `rows` rows in one statement.
    pub fn sql(&self, rows: usize) -> String {
        let mut sql = String::with_capacity(self.prefix.len() + rows * (self.placeholders.len() + 2));
        sql.push_str(&self.prefix);
        for i in 0..rows {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&self.placeholders);
        }
        sql
    }

    /// Encode a row into its parameter list.
    pub fn bind(&self, row: &dyn Row) -> Result<Vec<Value>> {
        let values = row.insert_values()?;
        check_len(&self.table, self.fields.len(), values.len())?;
        Ok(values)
    }

    /// Largest row count whose parameters fit under `max_params`.
    pub fn max_rows_per_statement(&self, max_params: usize) -> usize {
        (max_params / self.fields.len().max(1)).max(1)
    }
}

/// Single-row update keyed by ID, over every field except the ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkUpdateStmt {
    table: String,
    fields: Vec<String>,
    sql: String,
}

impl BulkUpdateStmt {
    /// `fields` must not contain the ID column.
    pub fn new(table: &str, fields: &[&str]) -> Self {
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        let assignments: Vec<String> = fields.iter().map(|f| format!("{} = ?", f)).collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?",
            table,
            assignments.join(", ")
        );
        Self {
            table: table.to_string(),
            fields,
            sql,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// SQL text, executed once per row.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Encode a row: update values followed by the ID checksum.
    pub fn bind(&self, row: &dyn Row) -> Result<Vec<Value>> {
        let mut values = row.update_values()?;
        check_len(&self.table, self.fields.len(), values.len())?;
        values.push(Value::Binary(checksum(row.id())));
        Ok(values)
    }
}

/// Batched delete by ID set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkDeleteStmt {
    table: String,
    prefix: String,
}

impl BulkDeleteStmt {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            prefix: format!("DELETE FROM {} WHERE id IN ", table),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// SQL text deleting `ids` IDs in one statement.
    pub fn sql(&self, ids: usize) -> String {
        format!("{}({})", self.prefix, vec!["?"; ids].join(", "))
    }
}

/// The three descriptors of one object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statements {
    pub insert: BulkInsertStmt,
    pub update: BulkUpdateStmt,
    pub delete: BulkDeleteStmt,
}

impl Statements {
    pub fn for_object(object_type: &ObjectType) -> Self {
        Self {
            insert: BulkInsertStmt::new(object_type.table(), object_type.fields),
            update: BulkUpdateStmt::new(object_type.table(), object_type.update_fields()),
            delete: BulkDeleteStmt::new(object_type.table()),
        }
    }
}

fn check_len(table: &str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(CoreError::FieldCountMismatch {
            table: table.to_string(),
            expected,
            got,
        });
    }
    Ok(())
}

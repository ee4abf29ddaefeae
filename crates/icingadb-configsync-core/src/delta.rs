//! Delta computation between two ID sets.
//!
//! A snapshot reconciliation: given the IDs known to the key/value store and
//! the IDs known to the relational store, partition them into what must be
//! inserted, updated and deleted.

use std::collections::BTreeSet;

/// Three pairwise disjoint ID sets, each sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    /// In the key/value store only.
    pub insert: Vec<String>,
    /// In both stores.
    pub update: Vec<String>,
    /// In the relational store only.
    pub delete: Vec<String>,
}

impl Delta {
    /// `(insert, update, delete)` sizes.
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.insert.len(), self.update.len(), self.delete.len())
    }

    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Partition `kv` and `sql` into insert = kv∖sql, update = kv∩sql,
/// delete = sql∖kv. Duplicates in the inputs are ignored.
pub fn delta<K, S>(kv: K, sql: S) -> Delta
where
    K: IntoIterator<Item = String>,
    S: IntoIterator<Item = String>,
{
    let kv: BTreeSet<String> = kv.into_iter().collect();
    let sql: BTreeSet<String> = sql.into_iter().collect();

    Delta {
        insert: kv.difference(&sql).cloned().collect(),
        update: kv.intersection(&sql).cloned().collect(),
        delete: sql.difference(&kv).cloned().collect(),
    }
}

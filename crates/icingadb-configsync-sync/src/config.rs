//! Sync pipeline configuration.

use serde::Deserialize;

use crate::error::{Result, SyncError};

/// Tuning knobs shared by every Operator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Decode pool size, shared across all object types.
    pub decode_workers: usize,
    /// IDs per batch handed from the Operator to prep and delete workers.
    pub batch_size: usize,
    /// Keys per key/value fetch.
    pub chunk_size: usize,
    /// Concurrent bulk statements per exec worker.
    pub max_in_flight: usize,
    /// Capacity of every pipeline channel.
    pub channel_capacity: usize,
    /// Rewrite rows present in both stores on responsibility acquisition.
    pub reconcile_updates: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            decode_workers: 16,
            batch_size: 500,
            chunk_size: 500,
            max_in_flight: 4,
            channel_capacity: 64,
            reconcile_updates: true,
        }
    }
}

impl SyncConfig {
    /// Check that every size is usable.
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("decode_workers", self.decode_workers),
            ("batch_size", self.batch_size),
            ("chunk_size", self.chunk_size),
            ("max_in_flight", self.max_in_flight),
            ("channel_capacity", self.channel_capacity),
        ];
        for (field, value) in sizes {
            if value == 0 {
                return Err(SyncError::ZeroSize { field });
            }
        }
        Ok(())
    }
}

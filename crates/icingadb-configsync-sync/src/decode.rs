//! Shared decode pool.
//!
//! Prep workers hand over raw payloads in groups; a fixed number of pool
//! workers turn each unit into a typed row and send the group back on the
//! reply channel that came with it.

use icingadb_configsync_core::{Row, RowFactory};
use serde_json::{Map, Value as Json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Result, SyncError};

/// One object to decode.
pub struct DecodePackage {
    pub id: String,
    pub checksums_raw: String,
    pub config_raw: String,
    pub factory: RowFactory,
    pub object_type: &'static str,
}

/// Units decoded together, with the channel the result goes to.
pub struct DecodePackages {
    pub packages: Vec<DecodePackage>,
    pub reply: mpsc::Sender<DecodedBatch>,
}

/// Decoded rows of one [`DecodePackages`].
#[derive(Debug, Default)]
pub struct DecodedBatch {
    pub rows: Vec<Box<dyn Row>>,
    /// Units that failed to decode.
    pub dropped: usize,
}

impl DecodedBatch {
    /// Every unit the batch accounts for.
    pub fn len(&self) -> usize {
        self.rows.len() + self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Submits work to a running [`DecodePool`].
#[derive(Clone)]
pub struct DecodePoolHandle {
    tx: async_channel::Sender<DecodePackages>,
}

impl DecodePoolHandle {
    /// Queue a group, waiting while the pool is saturated.
    pub async fn submit(&self, packages: DecodePackages) -> Result<()> {
        self.tx
            .send(packages)
            .await
            .map_err(|_| SyncError::ChannelClosed("decode pool"))
    }
}

/// Fixed set of decode workers sharing one input queue.
pub struct DecodePool {
    workers: Vec<JoinHandle<()>>,
}

impl DecodePool {
    /// Start `workers` decoders. The pool runs until every handle is dropped.
    pub fn spawn(workers: usize, capacity: usize) -> (DecodePoolHandle, DecodePool) {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        let workers = (0..workers.max(1))
            .map(|_| tokio::spawn(run_worker(rx.clone())))
            .collect();
        (DecodePoolHandle { tx }, DecodePool { workers })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Wait for all workers to exit. Only returns once every handle is gone.
    pub async fn shutdown(self) {
        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!("decode worker panicked: {}", e);
            }
        }
    }
}

async fn run_worker(rx: async_channel::Receiver<DecodePackages>) {
    while let Ok(DecodePackages { packages, reply }) = rx.recv().await {
        let batch = decode_all(packages);
        if reply.send(batch).await.is_err() {
            tracing::debug!("decoded batch discarded, pipeline stopped");
        }
    }
}

/// Decode a group, dropping units that fail.
pub fn decode_all(packages: Vec<DecodePackage>) -> DecodedBatch {
    let mut batch = DecodedBatch {
        rows: Vec::with_capacity(packages.len()),
        dropped: 0,
    };
    for package in packages {
        match decode(package) {
            Ok(row) => batch.rows.push(row),
            Err(e) => {
                tracing::warn!("{}", e);
                batch.dropped += 1;
            }
        }
    }
    batch
}

/// Build one row from its config and checksum payloads.
///
/// Both payloads must be JSON objects. Checksum fields win over config
/// fields of the same name.
pub fn decode(package: DecodePackage) -> Result<Box<dyn Row>> {
    let DecodePackage {
        id,
        checksums_raw,
        config_raw,
        factory,
        object_type,
    } = package;
    let failed = |reason: String| SyncError::Decode {
        object_type,
        id: id.clone(),
        reason,
    };

    let mut fields: Map<String, Json> =
        serde_json::from_str(&config_raw).map_err(|e| failed(format!("config: {}", e)))?;
    let checksums: Map<String, Json> =
        serde_json::from_str(&checksums_raw).map_err(|e| failed(format!("checksums: {}", e)))?;
    fields.extend(checksums);

    let mut row = factory();
    row.populate(fields).map_err(|e| failed(e.to_string()))?;
    row.set_id(id);
    Ok(row)
}

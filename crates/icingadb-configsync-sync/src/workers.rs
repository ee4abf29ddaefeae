//! Pipeline stages run while an Operator holds responsibility.
//!
//! Every stage stops once the pipeline's cancellation token fires or its
//! input channel closes. Exec stages then wait for their in-flight
//! statements before returning.

use std::future::Future;
use std::sync::Arc;

use icingadb_configsync_core::{
    decode_checksum, Checksum, CoreError, ObjectType, Operation, Row, Statements,
};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::SyncConfig;
use crate::decode::{DecodePackage, DecodePackages, DecodedBatch};
use crate::error::{Result, StoreSide, SyncError};
use crate::progress::Progress;
use crate::supervisor::Supervisor;

/// IDs handed from the Operator to a stage.
pub(crate) type KeyBatch = Vec<String>;

/// Everything the stages of one pipeline share.
pub(crate) struct Stage {
    pub object_type: ObjectType,
    pub statements: Statements,
    pub supervisor: Supervisor,
    pub config: SyncConfig,
    pub cancel: CancellationToken,
}

impl Stage {
    fn name(&self) -> &'static str {
        self.object_type.name
    }
}

/// Row-writing directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Upsert {
    Insert,
    Update,
}

impl Upsert {
    fn operation(self) -> Operation {
        match self {
            Upsert::Insert => Operation::Insert,
            Upsert::Update => Operation::Update,
        }
    }
}

/// Fetch payloads for each key batch and queue them for decoding.
pub(crate) async fn prep(
    stage: Arc<Stage>,
    mut keys: mpsc::Receiver<KeyBatch>,
    reply: mpsc::Sender<DecodedBatch>,
    progress: Arc<Progress>,
    upsert: Upsert,
) {
    loop {
        let ids = tokio::select! {
            biased;
            _ = stage.cancel.cancelled() => break,
            ids = keys.recv() => match ids {
                Some(ids) => ids,
                None => break,
            },
        };
        if !prep_batch(&stage, ids, &reply, &progress).await {
            break;
        }
    }
    tracing::debug!(
        object_type = stage.name(),
        operation = %upsert.operation(),
        "prep stopped"
    );
}

/// Returns false once the stage should stop.
///
/// Keys that never reach the decoder are completed on `progress` here, so a
/// failed batch still drains its direction.
async fn prep_batch(
    stage: &Stage,
    ids: KeyBatch,
    reply: &mpsc::Sender<DecodedBatch>,
    progress: &Progress,
) -> bool {
    let mut outstanding = ids.len();
    let mut chunks = stage.supervisor.config_store.fetch_config_chunks(
        stage.cancel.child_token(),
        ids,
        &stage.object_type,
        stage.config.chunk_size,
    );

    loop {
        let chunk = tokio::select! {
            biased;
            _ = stage.cancel.cancelled() => return false,
            chunk = chunks.recv() => match chunk {
                Some(chunk) => chunk,
                None => {
                    progress.complete(outstanding);
                    return true;
                }
            },
        };

        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(source) => {
                // the rest of this batch is abandoned
                stage.supervisor.errors.report(SyncError::Fetch {
                    object_type: stage.name(),
                    side: StoreSide::KeyValue,
                    source,
                });
                progress.complete(outstanding);
                return true;
            }
        };

        let packages: Vec<DecodePackage> = chunk
            .entries()
            .map(|(id, config, checksums)| DecodePackage {
                id: id.to_string(),
                checksums_raw: checksums.to_string(),
                config_raw: config.to_string(),
                factory: stage.object_type.factory,
                object_type: stage.name(),
            })
            .collect();

        let skipped = chunk.len() - packages.len();
        if skipped > 0 {
            tracing::debug!(
                object_type = stage.name(),
                skipped,
                "keys vanished before their payload was read"
            );
            progress.complete(skipped);
        }
        outstanding = outstanding.saturating_sub(skipped);
        if packages.is_empty() {
            continue;
        }
        let queued = packages.len();

        let submitted = tokio::select! {
            biased;
            _ = stage.cancel.cancelled() => return false,
            submitted = stage.supervisor.decoder.submit(DecodePackages {
                packages,
                reply: reply.clone(),
            }) => submitted,
        };
        if let Err(e) = submitted {
            stage.supervisor.errors.report(e);
            progress.complete(outstanding);
            return false;
        }
        outstanding = outstanding.saturating_sub(queued);
    }
}

/// Write decoded rows with at most `max_in_flight` concurrent statements.
pub(crate) async fn exec_upserts(
    stage: Arc<Stage>,
    batches: mpsc::Receiver<DecodedBatch>,
    progress: Arc<Progress>,
    upsert: Upsert,
) {
    let exec_stage = stage.clone();
    bounded(&stage, batches, move |batch: DecodedBatch| {
        let stage = exec_stage.clone();
        let progress = progress.clone();
        async move {
            let units = batch.len();
            if let Err(e) = write_rows(&stage, batch.rows, upsert).await {
                stage.supervisor.errors.report(e);
            }
            progress.complete(units);
        }
    })
    .await;
    tracing::debug!(
        object_type = stage.name(),
        operation = %upsert.operation(),
        "exec stopped"
    );
}

/// Delete rows by their hex ID.
pub(crate) async fn exec_deletes(
    stage: Arc<Stage>,
    keys: mpsc::Receiver<KeyBatch>,
    progress: Arc<Progress>,
) {
    let exec_stage = stage.clone();
    bounded(&stage, keys, move |ids: KeyBatch| {
        let stage = exec_stage.clone();
        let progress = progress.clone();
        async move {
            let units = ids.len();
            if let Err(e) = delete_rows(&stage, ids).await {
                stage.supervisor.errors.report(e);
            }
            progress.complete(units);
        }
    })
    .await;
    tracing::debug!(object_type = stage.name(), "exec delete stopped");
}

async fn bounded<T, F, Fut>(stage: &Stage, mut input: mpsc::Receiver<T>, exec: F)
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut in_flight = JoinSet::new();
    loop {
        let item = tokio::select! {
            biased;
            _ = stage.cancel.cancelled() => break,
            item = input.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };
        while in_flight.len() >= stage.config.max_in_flight {
            reap(in_flight.join_next().await);
        }
        // a slot may free up only after cancellation
        if stage.cancel.is_cancelled() {
            break;
        }
        in_flight.spawn(exec(item));
    }
    while let Some(joined) = in_flight.join_next().await {
        reap(Some(joined));
    }
}

fn reap(joined: Option<std::result::Result<(), JoinError>>) {
    if let Some(Err(e)) = joined {
        if e.is_panic() {
            tracing::error!("bulk statement task panicked: {}", e);
        }
    }
}

async fn write_rows(stage: &Stage, rows: Vec<Box<dyn Row>>, upsert: Upsert) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let object_type = stage.name();
    let operation = upsert.operation();
    let integrity = |source: CoreError| SyncError::Integrity {
        object_type,
        operation,
        source,
    };
    let store = &stage.supervisor.relational_store;
    let statements = &stage.statements;
    let count = rows.len();

    let written = match upsert {
        Upsert::Insert => {
            let values = rows
                .iter()
                .map(|row| statements.insert.bind(row.as_ref()))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(integrity)?;
            store.bulk_insert(&statements.insert, values).await
        }
        Upsert::Update => {
            let values = rows
                .iter()
                .map(|row| statements.update.bind(row.as_ref()))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(integrity)?;
            store.bulk_update(&statements.update, values).await
        }
    };

    let affected = written.map_err(|source| SyncError::BulkExec {
        object_type,
        operation,
        rows: count,
        source,
    })?;
    tracing::debug!(object_type, %operation, rows = count, affected, "bulk statement done");
    Ok(())
}

async fn delete_rows(stage: &Stage, ids: KeyBatch) -> Result<()> {
    let object_type = stage.name();
    let ids = ids
        .iter()
        .map(|id| decode_checksum(id))
        .collect::<std::result::Result<Vec<Checksum>, _>>()
        .map_err(|source| SyncError::Integrity {
            object_type,
            operation: Operation::Delete,
            source,
        })?;
    if ids.is_empty() {
        return Ok(());
    }

    let count = ids.len();
    let affected = stage
        .supervisor
        .relational_store
        .bulk_delete(&stage.statements.delete, ids)
        .await
        .map_err(|source| SyncError::BulkExec {
            object_type,
            operation: Operation::Delete,
            rows: count,
            source,
        })?;
    tracing::debug!(object_type, rows = count, affected, "bulk delete done");
    Ok(())
}

/// Log each time a direction finishes everything handed to it so far.
pub(crate) async fn report_progress(
    stage: Arc<Stage>,
    progress: Arc<Progress>,
    operation: Operation,
) {
    let verb = match operation {
        Operation::Insert => "Inserted",
        Operation::Update => "Updated",
        Operation::Delete => "Deleted",
    };
    let mut seen = None;
    loop {
        let total = tokio::select! {
            biased;
            _ = stage.cancel.cancelled() => break,
            total = progress.wait_drained(seen) => total,
        };
        let count = total - seen.unwrap_or(0);
        let elapsed = progress.elapsed();
        tracing::info!(
            object_type = stage.name(),
            count,
            elapsed_ms = elapsed.as_millis() as u64,
            "{} {} {}s in {:?}",
            verb,
            count,
            stage.name(),
            elapsed
        );
        seen = Some(total);
    }
}

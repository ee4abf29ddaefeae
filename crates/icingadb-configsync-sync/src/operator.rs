//! Per-object-type Operator.
//!
//! An Operator is idle until it becomes responsible. It then computes the
//! delta between both stores once and runs a pipeline until responsibility
//! is lost, at which point the pipeline is cancelled and joined before the
//! next notification is handled. At most one pipeline per object type exists
//! at any time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use icingadb_configsync_core::{checksum, delta, ObjectType, Operation, Statements};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::SyncConfig;
use crate::error::{Result, StoreSide, SyncError};
use crate::ha::HaNotification;
use crate::progress::Progress;
use crate::supervisor::Supervisor;
use crate::workers::{self, KeyBatch, Stage, Upsert};

/// Lifecycle of an Operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorState {
    /// Not responsible; nothing runs.
    Idle,
    /// Responsible; the initial delta is still being applied.
    Active,
    /// Responsible; every row of the initial delta has been handled.
    Synced,
}

impl OperatorState {
    pub fn is_responsible(&self) -> bool {
        !matches!(self, OperatorState::Idle)
    }
}

impl fmt::Display for OperatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorState::Idle => f.write_str("idle"),
            OperatorState::Active => f.write_str("active"),
            OperatorState::Synced => f.write_str("synced"),
        }
    }
}

struct Request {
    operation: Operation,
    ids: Vec<String>,
    reply: oneshot::Sender<Result<()>>,
}

/// Drives a running [`Operator`] from outside.
#[derive(Clone)]
pub struct OperatorHandle {
    object_type: &'static str,
    requests: mpsc::UnboundedSender<Request>,
    state: watch::Receiver<OperatorState>,
}

impl OperatorHandle {
    pub fn object_type(&self) -> &'static str {
        self.object_type
    }

    pub fn state(&self) -> OperatorState {
        *self.state.borrow()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<OperatorState> {
        self.state.clone()
    }

    /// Wait until the Operator reaches `state`.
    pub async fn wait_for(&self, state: OperatorState) -> Result<()> {
        let mut rx = self.state.clone();
        let reached = rx.wait_for(|current| *current == state).await.is_ok();
        if reached {
            Ok(())
        } else {
            Err(SyncError::ChannelClosed("operator state"))
        }
    }

    /// Write the given objects as new rows.
    pub async fn request_insert(&self, ids: Vec<String>) -> Result<()> {
        self.request(Operation::Insert, ids).await
    }

    /// Rewrite the rows of the given objects from their current payload.
    pub async fn request_update(&self, ids: Vec<String>) -> Result<()> {
        self.request(Operation::Update, ids).await
    }

    /// Delete the rows of the given objects.
    pub async fn request_delete(&self, ids: Vec<String>) -> Result<()> {
        self.request(Operation::Delete, ids).await
    }

    /// Fails with [`SyncError::NotResponsible`] while the Operator is idle.
    async fn request(&self, operation: Operation, ids: Vec<String>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(Request {
                operation,
                ids,
                reply,
            })
            .map_err(|_| SyncError::ChannelClosed("operator"))?;
        rx.await.map_err(|_| SyncError::ChannelClosed("operator"))?
    }
}

/// One direction of a running pipeline.
struct Direction {
    keys: mpsc::Sender<KeyBatch>,
    progress: Arc<Progress>,
}

impl Direction {
    fn new(keys: mpsc::Sender<KeyBatch>) -> Self {
        Self {
            keys,
            progress: Progress::new(),
        }
    }
}

/// Workers and key channels of one responsibility period.
struct Pipeline {
    stage: Arc<Stage>,
    insert: Direction,
    update: Direction,
    delete: Direction,
    tasks: JoinSet<()>,
}

impl Pipeline {
    fn start(
        object_type: ObjectType,
        supervisor: Supervisor,
        config: SyncConfig,
    ) -> Self {
        let capacity = config.channel_capacity;
        let stage = Arc::new(Stage {
            statements: Statements::for_object(&object_type),
            object_type,
            supervisor,
            config,
            cancel: CancellationToken::new(),
        });

        let (insert_tx, insert_rx) = mpsc::channel(capacity);
        let (update_tx, update_rx) = mpsc::channel(capacity);
        let (delete_tx, delete_rx) = mpsc::channel(capacity);
        let (inserted_tx, inserted_rx) = mpsc::channel(capacity);
        let (updated_tx, updated_rx) = mpsc::channel(capacity);
        let insert = Direction::new(insert_tx);
        let update = Direction::new(update_tx);
        let delete = Direction::new(delete_tx);

        let mut tasks = JoinSet::new();
        tasks.spawn(workers::prep(
            stage.clone(),
            insert_rx,
            inserted_tx,
            insert.progress.clone(),
            Upsert::Insert,
        ));
        tasks.spawn(workers::prep(
            stage.clone(),
            update_rx,
            updated_tx,
            update.progress.clone(),
            Upsert::Update,
        ));
        tasks.spawn(workers::exec_upserts(
            stage.clone(),
            inserted_rx,
            insert.progress.clone(),
            Upsert::Insert,
        ));
        tasks.spawn(workers::exec_upserts(
            stage.clone(),
            updated_rx,
            update.progress.clone(),
            Upsert::Update,
        ));
        tasks.spawn(workers::exec_deletes(
            stage.clone(),
            delete_rx,
            delete.progress.clone(),
        ));

        Self {
            stage,
            insert,
            update,
            delete,
            tasks,
        }
    }

    fn direction(&self, operation: Operation) -> &Direction {
        match operation {
            Operation::Insert => &self.insert,
            Operation::Update => &self.update,
            Operation::Delete => &self.delete,
        }
    }

    /// Queue `ids` in batches. The direction's total is raised first.
    fn dispatch(&mut self, operation: Operation, ids: Vec<String>) {
        if ids.is_empty() {
            return;
        }
        let direction = self.direction(operation);
        direction.progress.announce(ids.len());

        let keys = direction.keys.clone();
        let cancel = self.stage.cancel.clone();
        let batch_size = self.stage.config.batch_size;
        self.tasks.spawn(async move {
            for batch in ids.chunks(batch_size) {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = keys.send(batch.to_vec()) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Log each direction as it drains.
    ///
    /// Must run after the initial dispatch, or a logger could report an
    /// empty direction before its total is announced.
    fn report_progress(&mut self) {
        let directions = [
            (self.insert.progress.clone(), Operation::Insert),
            (self.update.progress.clone(), Operation::Update),
            (self.delete.progress.clone(), Operation::Delete),
        ];
        for (progress, operation) in directions {
            self.tasks.spawn(workers::report_progress(
                self.stage.clone(),
                progress,
                operation,
            ));
        }
    }

    /// Flip Active to Synced once all three directions drain.
    ///
    /// Must run after the initial dispatch so the totals are final.
    fn watch_initial_sync(&mut self, state: Arc<watch::Sender<OperatorState>>) {
        let cancel = self.stage.cancel.clone();
        let progress = [
            self.insert.progress.clone(),
            self.update.progress.clone(),
            self.delete.progress.clone(),
        ];
        self.tasks.spawn(async move {
            let [insert, update, delete] = progress;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = async {
                    tokio::join!(
                        insert.wait_drained(None),
                        update.wait_drained(None),
                        delete.wait_drained(None),
                    )
                } => {
                    state.send_if_modified(|current| {
                        let active = *current == OperatorState::Active;
                        if active {
                            *current = OperatorState::Synced;
                        }
                        active
                    });
                }
            }
        });
    }

    /// Cancel every stage and wait for all of them to finish.
    async fn shutdown(self) {
        let Pipeline {
            stage,
            insert,
            update,
            delete,
            mut tasks,
        } = self;
        stage.cancel.cancel();
        drop((insert, update, delete));

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    tracing::error!(
                        object_type = stage.object_type.name,
                        "pipeline task panicked: {}",
                        e
                    );
                }
            }
        }
    }
}

/// Syncs one object type while its instance is responsible.
pub struct Operator {
    object_type: ObjectType,
    supervisor: Supervisor,
    config: SyncConfig,
    requests: mpsc::UnboundedReceiver<Request>,
    state: Arc<watch::Sender<OperatorState>>,
    pipeline: Option<Pipeline>,
}

impl Operator {
    pub fn new(
        object_type: ObjectType,
        supervisor: Supervisor,
        config: SyncConfig,
    ) -> (Self, OperatorHandle) {
        let (requests_tx, requests) = mpsc::unbounded_channel();
        let (state, state_rx) = watch::channel(OperatorState::Idle);
        let operator = Self {
            object_type,
            supervisor,
            config,
            requests,
            state: Arc::new(state),
            pipeline: None,
        };
        let handle = OperatorHandle {
            object_type: object_type.name,
            requests: requests_tx,
            state: state_rx,
        };
        (operator, handle)
    }

    pub fn object_type(&self) -> &ObjectType {
        &self.object_type
    }

    /// Handle notifications until `ha` closes, then stop any running
    /// pipeline and return.
    pub async fn run(mut self, mut ha: mpsc::UnboundedReceiver<HaNotification>) {
        let name = self.object_type.name;
        tracing::debug!(object_type = name, "operator started");
        loop {
            tokio::select! {
                biased;
                notification = ha.recv() => match notification {
                    Some(HaNotification::IsResponsible) => self.take_over().await,
                    Some(HaNotification::IsNotResponsible) => self.hand_over().await,
                    None => break,
                },
                Some(request) = self.requests.recv() => {
                    let result = self.dispatch_request(request.operation, request.ids);
                    let _ = request.reply.send(result);
                }
            }
        }
        self.hand_over().await;
        tracing::debug!(object_type = name, "operator stopped");
    }

    async fn take_over(&mut self) {
        let name = self.object_type.name;
        if self.pipeline.is_some() {
            tracing::debug!(object_type = name, "already responsible");
            return;
        }

        let checksum_key = self.object_type.checksum_key();
        let table = self.object_type.table();
        let config_store = &self.supervisor.config_store;
        let relational_store = &self.supervisor.relational_store;
        let fetched = tokio::try_join!(
            async {
                config_store
                    .list_keys(&checksum_key)
                    .await
                    .map_err(|source| SyncError::Fetch {
                        object_type: name,
                        side: StoreSide::KeyValue,
                        source,
                    })
            },
            async {
                relational_store
                    .fetch_all_ids(table)
                    .await
                    .map_err(|source| SyncError::Fetch {
                        object_type: name,
                        side: StoreSide::Relational,
                        source,
                    })
            },
        );
        let (kv_ids, sql_ids) = match fetched {
            Ok(ids) => ids,
            Err(e) => {
                self.supervisor.errors.report(e);
                return;
            }
        };

        // the relational store keys rows by the checksum of the object ID
        let by_checksum: HashMap<String, String> = kv_ids
            .into_iter()
            .map(|id| (checksum(&id).to_hex(), id))
            .collect();
        let delta = delta(by_checksum.keys().cloned(), sql_ids);
        let (insert, update, delete) = delta.counts();
        tracing::info!(
            object_type = name,
            "Insert: {}, Update: {}, Delete: {}",
            insert,
            update,
            delete
        );

        let to_ids = |hashed: Vec<String>| -> Vec<String> {
            hashed
                .into_iter()
                .filter_map(|key| by_checksum.get(&key).cloned())
                .collect()
        };

        let mut pipeline = Pipeline::start(
            self.object_type,
            self.supervisor.clone(),
            self.config.clone(),
        );
        pipeline.dispatch(Operation::Insert, to_ids(delta.insert));
        if self.config.reconcile_updates {
            pipeline.dispatch(Operation::Update, to_ids(delta.update));
        }
        pipeline.dispatch(Operation::Delete, delta.delete);

        self.state.send_replace(OperatorState::Active);
        pipeline.report_progress();
        pipeline.watch_initial_sync(self.state.clone());
        self.pipeline = Some(pipeline);
    }

    async fn hand_over(&mut self) {
        let Some(pipeline) = self.pipeline.take() else {
            tracing::debug!(object_type = self.object_type.name, "not responsible");
            return;
        };
        pipeline.shutdown().await;
        self.state.send_replace(OperatorState::Idle);
        tracing::info!(
            object_type = self.object_type.name,
            "stopped syncing, responsibility lost"
        );
    }

    fn dispatch_request(&mut self, operation: Operation, ids: Vec<String>) -> Result<()> {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return Err(SyncError::NotResponsible(self.object_type.name));
        };
        let ids = match operation {
            Operation::Delete => ids.iter().map(|id| checksum(id).to_hex()).collect(),
            Operation::Insert | Operation::Update => ids,
        };
        pipeline.dispatch(operation, ids);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use icingadb_configsync_core::objects::HOST;
    use icingadb_configsync_store::{MemoryConfigStore, MemoryRelationalStore};
    use tokio::task::JoinHandle;

    use crate::decode::DecodePool;
    use crate::ha::HaNotifier;
    use crate::supervisor::ErrorSink;

    struct Harness {
        kv: MemoryConfigStore,
        db: Arc<MemoryRelationalStore>,
        ha: HaNotifier,
        handle: OperatorHandle,
        errors: mpsc::UnboundedReceiver<SyncError>,
        task: JoinHandle<()>,
    }

    fn put_host(kv: &MemoryConfigStore, name: &str) {
        let config = format!(r#"{{"name":"{0}","display_name":"{0}"}}"#, name);
        let checksums = format!(
            r#"{{"properties_checksum":"{}"}}"#,
            checksum(&config).to_hex()
        );
        kv.put_object(&HOST, name, &config, &checksums);
    }

    fn harness(config: SyncConfig) -> Harness {
        let kv = MemoryConfigStore::new();
        let db = Arc::new(MemoryRelationalStore::new());
        let (decoder, _pool) = DecodePool::spawn(2, 8);
        let (errors, error_rx) = ErrorSink::channel();
        let supervisor = Supervisor {
            config_store: Arc::new(kv.clone()),
            relational_store: db.clone(),
            decoder,
            errors,
        };

        let ha = HaNotifier::new();
        let (operator, handle) = Operator::new(HOST, supervisor, config);
        let task = tokio::spawn(operator.run(ha.register_notification_listener()));
        Harness {
            kv,
            db,
            ha,
            handle,
            errors: error_rx,
            task,
        }
    }

    async fn synced(handle: &OperatorHandle) {
        tokio::time::timeout(Duration::from_secs(5), handle.wait_for(OperatorState::Synced))
            .await
            .expect("operator did not sync in time")
            .unwrap();
    }

    async fn eventually(mut check: impl FnMut() -> bool) {
        for _ in 0..500 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_initial_sync_applies_delta() {
        let h = harness(SyncConfig::default());
        for name in ["h1", "h2", "h3"] {
            put_host(&h.kv, name);
        }
        h.db.seed("host", &[checksum("h2"), checksum("h4")]);

        h.ha.notify(HaNotification::IsResponsible);
        synced(&h.handle).await;

        let ids: Vec<_> = h.db.ids("host").into_iter().collect();
        let mut expected = vec![checksum("h1"), checksum("h2"), checksum("h3")];
        expected.sort();
        assert_eq!(ids, expected);
        assert_eq!(h.db.executed_rows("host", Operation::Insert), 2);
        assert_eq!(h.db.executed_rows("host", Operation::Update), 1);
        assert_eq!(h.db.executed_rows("host", Operation::Delete), 1);
    }

    #[tokio::test]
    async fn test_updates_can_be_skipped() {
        let h = harness(SyncConfig {
            reconcile_updates: false,
            ..SyncConfig::default()
        });
        put_host(&h.kv, "h1");
        h.db.seed("host", &[checksum("h1")]);

        h.ha.notify(HaNotification::IsResponsible);
        synced(&h.handle).await;
        assert!(h.db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_responsibility_is_noop() {
        let h = harness(SyncConfig::default());
        put_host(&h.kv, "h1");

        h.ha.notify(HaNotification::IsResponsible);
        synced(&h.handle).await;
        h.ha.notify(HaNotification::IsResponsible);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(h.handle.state(), OperatorState::Synced);
        assert_eq!(h.db.executed_rows("host", Operation::Insert), 1);
    }

    #[tokio::test]
    async fn test_idle_operator_rejects_requests() {
        let h = harness(SyncConfig::default());
        h.ha.notify(HaNotification::IsNotResponsible);

        let err = h.handle.request_update(vec!["h1".into()]).await.unwrap_err();
        assert!(matches!(err, SyncError::NotResponsible("host")));
        assert_eq!(h.handle.state(), OperatorState::Idle);
    }

    #[tokio::test]
    async fn test_flip_before_dispatch_writes_nothing() {
        let kv = MemoryConfigStore::new();
        put_host(&kv, "h1");
        let db = Arc::new(MemoryRelationalStore::new());
        db.seed("host", &[checksum("h4")]);

        let (decoder, pool) = DecodePool::spawn(1, 1);
        let (errors, _error_rx) = ErrorSink::channel();
        let supervisor = Supervisor {
            config_store: Arc::new(kv),
            relational_store: db.clone(),
            decoder,
            errors,
        };
        let (operator, handle) = Operator::new(HOST, supervisor, SyncConfig::default());

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(HaNotification::IsResponsible).unwrap();
        tx.send(HaNotification::IsNotResponsible).unwrap();
        drop(tx);

        // returns only once every pipeline task has been joined
        tokio::time::timeout(Duration::from_secs(5), operator.run(rx))
            .await
            .unwrap();

        assert!(db.executed().is_empty());
        assert_eq!(handle.state(), OperatorState::Idle);
        drop(handle);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_lost_responsibility_stops_pipeline() {
        let h = harness(SyncConfig::default());
        put_host(&h.kv, "h1");

        h.ha.notify(HaNotification::IsResponsible);
        synced(&h.handle).await;
        h.ha.notify(HaNotification::IsNotResponsible);
        tokio::time::timeout(Duration::from_secs(5), h.handle.wait_for(OperatorState::Idle))
            .await
            .unwrap()
            .unwrap();

        assert!(h.handle.request_insert(vec!["h1".into()]).await.is_err());

        h.ha.notify(HaNotification::IsResponsible);
        synced(&h.handle).await;
        // second acquisition sees h1 in both stores
        assert_eq!(h.db.executed_rows("host", Operation::Update), 1);
    }

    #[tokio::test]
    async fn test_request_update_while_responsible() {
        let h = harness(SyncConfig::default());
        put_host(&h.kv, "h1");
        h.ha.notify(HaNotification::IsResponsible);
        synced(&h.handle).await;

        h.kv.put_object(&HOST, "h1", r#"{"name":"h1","display_name":"Web"}"#, "{}");
        h.handle.request_update(vec!["h1".into()]).await.unwrap();

        let db = h.db.clone();
        eventually(move || db.executed_rows("host", Operation::Update) == 1).await;
        let row = h.db.row("host", &checksum("h1")).unwrap();
        assert!(row.contains(&icingadb_configsync_core::Value::Text("Web".into())));
    }

    #[tokio::test]
    async fn test_request_delete_uses_object_ids() {
        let h = harness(SyncConfig::default());
        put_host(&h.kv, "h1");
        h.ha.notify(HaNotification::IsResponsible);
        synced(&h.handle).await;

        h.handle.request_delete(vec!["h1".into()]).await.unwrap();
        let db = h.db.clone();
        eventually(move || db.ids("host").is_empty()).await;
    }

    #[tokio::test]
    async fn test_bad_payloads_are_dropped() {
        let h = harness(SyncConfig::default());
        put_host(&h.kv, "h1");
        h.kv.put_object(&HOST, "h2", "not json", "{}");
        put_host(&h.kv, "h3");
        h.kv.hdel(&HOST.config_key(), "h3");

        h.ha.notify(HaNotification::IsResponsible);
        synced(&h.handle).await;

        let ids: Vec<_> = h.db.ids("host").into_iter().collect();
        assert_eq!(ids, vec![checksum("h1")]);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported() {
        let mut h = harness(SyncConfig::default());
        h.kv.set_fail_list_keys(true);

        h.ha.notify(HaNotification::IsResponsible);
        let err = h.errors.recv().await.unwrap();
        assert!(matches!(
            err,
            SyncError::Fetch {
                object_type: "host",
                side: StoreSide::KeyValue,
                ..
            }
        ));
        assert_eq!(h.handle.state(), OperatorState::Idle);
    }

    #[tokio::test]
    async fn test_chunk_fetch_failure_still_syncs() {
        let mut h = harness(SyncConfig::default());
        put_host(&h.kv, "h1");
        put_host(&h.kv, "h2");
        h.kv.set_fail_fetch(true);

        h.ha.notify(HaNotification::IsResponsible);
        let err = h.errors.recv().await.unwrap();
        assert!(matches!(
            err,
            SyncError::Fetch {
                object_type: "host",
                side: StoreSide::KeyValue,
                ..
            }
        ));

        // the abandoned keys still count as handled
        synced(&h.handle).await;
        assert!(h.db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_in_flight_statement_finishes_after_handover() {
        let h = harness(SyncConfig {
            batch_size: 1,
            max_in_flight: 1,
            ..SyncConfig::default()
        });
        for name in ["h1", "h2", "h3", "h4"] {
            put_host(&h.kv, name);
        }
        h.db.set_exec_delay(Some(Duration::from_millis(200)));

        h.ha.notify(HaNotification::IsResponsible);
        h.handle.wait_for(OperatorState::Active).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(h.db.executed().is_empty());

        h.ha.notify(HaNotification::IsNotResponsible);
        tokio::time::timeout(Duration::from_secs(5), h.handle.wait_for(OperatorState::Idle))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(h.db.executed_rows("host", Operation::Insert), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(h.db.executed_rows("host", Operation::Insert), 1);
        assert_eq!(h.db.ids("host").len(), 1);
    }

    #[tokio::test]
    async fn test_exec_failure_is_reported() {
        let mut h = harness(SyncConfig::default());
        put_host(&h.kv, "h1");
        h.db.set_fail_exec(true);

        h.ha.notify(HaNotification::IsResponsible);
        let err = h.errors.recv().await.unwrap();
        assert!(matches!(
            err,
            SyncError::BulkExec {
                operation: Operation::Insert,
                rows: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_integrity_error_is_reported() {
        let mut h = harness(SyncConfig::default());
        h.kv.put_object(&HOST, "h1", r#"{"name":"h1","zone_id":"master"}"#, "{}");

        h.ha.notify(HaNotification::IsResponsible);
        let err = h.errors.recv().await.unwrap();
        assert!(matches!(err, SyncError::Integrity { .. }));
        assert!(h.db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_closing_listener_ends_operator() {
        let h = harness(SyncConfig::default());
        h.ha.notify(HaNotification::IsResponsible);
        synced(&h.handle).await;

        h.ha.close();
        tokio::time::timeout(Duration::from_secs(5), h.task)
            .await
            .unwrap()
            .unwrap();
    }
}

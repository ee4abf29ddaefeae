//! End-to-end sync against the in-memory stores.

use std::sync::Arc;
use std::time::Duration;

use icingadb_configsync::core::objects::{HOST, HOSTGROUP};
use icingadb_configsync::{
    checksum, Engine, EngineConfig, EngineError, HaNotification, Operation, OperatorHandle,
    OperatorState, RunningEngine, SyncError,
};
use icingadb_configsync::sync::StoreSide;
use icingadb_configsync_testkit::TestFixture;

fn init_logging() {
    let _ = icingadb_configsync::init_tracing("warn");
}

fn engine(fixture: &TestFixture, object_types: &[&str]) -> RunningEngine {
    let config = EngineConfig {
        object_types: object_types.iter().map(|t| t.to_string()).collect(),
        ..EngineConfig::default()
    };
    Engine::new(
        config,
        fixture.config_store(),
        fixture.db.clone(),
        fixture.ha.clone(),
    )
    .unwrap()
    .start()
}

async fn wait_for(handle: &OperatorHandle, state: OperatorState) {
    tokio::time::timeout(Duration::from_secs(10), handle.wait_for(state))
        .await
        .unwrap_or_else(|_| panic!("{} never became {}", handle.object_type(), state))
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_initial_sync_end_to_end() {
    init_logging();
    let fixture = TestFixture::new();
    fixture.put_hosts(&["h1", "h2", "h3"]);
    fixture.seed_hosts(&["h2", "h4"]);

    let running = engine(&fixture, &["host"]);
    fixture.ha.notify(HaNotification::IsResponsible);
    wait_for(running.handle("host").unwrap(), OperatorState::Synced).await;

    let ids: Vec<_> = fixture.db.ids("host").into_iter().collect();
    assert_eq!(ids, TestFixture::ids(&["h1", "h2", "h3"]));
    assert_eq!(fixture.db.executed_rows("host", Operation::Insert), 2);
    assert_eq!(fixture.db.executed_rows("host", Operation::Update), 1);
    assert_eq!(fixture.db.executed_rows("host", Operation::Delete), 1);

    // h2 was a bare row before and now carries its payload
    let h2 = fixture.db.row("host", &checksum("h2")).unwrap();
    assert_eq!(h2.len(), HOST.fields.len());

    fixture.ha.close();
    running.wait().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_object_types_sync_independently() {
    init_logging();
    let fixture = TestFixture::new();
    fixture.put_hosts(&["h1"]);
    fixture.put_hostgroups(&["linux", "windows"]);
    fixture.seed(&HOSTGROUP, &["solaris"]);

    let running = engine(&fixture, &["host", "hostgroup"]);
    fixture.ha.notify(HaNotification::IsResponsible);
    wait_for(running.handle("host").unwrap(), OperatorState::Synced).await;
    wait_for(running.handle("hostgroup").unwrap(), OperatorState::Synced).await;

    let hosts: Vec<_> = fixture.db.ids("host").into_iter().collect();
    let groups: Vec<_> = fixture.db.ids("hostgroup").into_iter().collect();
    assert_eq!(hosts, TestFixture::ids(&["h1"]));
    assert_eq!(groups, TestFixture::ids(&["linux", "windows"]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_incomplete_entries_are_skipped() {
    init_logging();
    let fixture = TestFixture::new();
    fixture.put_hosts(&["h1", "h2"]);
    fixture.kv.hdel(&HOST.config_key(), "h2");

    let running = engine(&fixture, &["host"]);
    fixture.ha.notify(HaNotification::IsResponsible);
    wait_for(running.handle("host").unwrap(), OperatorState::Synced).await;

    let ids: Vec<_> = fixture.db.ids("host").into_iter().collect();
    assert_eq!(ids, TestFixture::ids(&["h1"]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_responsibility_gates_writes() {
    init_logging();
    let fixture = TestFixture::new();
    fixture.put_hosts(&["h1"]);

    let running = engine(&fixture, &["host"]);
    let handle = running.handle("host").unwrap().clone();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(handle.state(), OperatorState::Idle);
    assert!(fixture.db.executed().is_empty());

    fixture.ha.notify(HaNotification::IsResponsible);
    wait_for(&handle, OperatorState::Synced).await;

    fixture.ha.notify(HaNotification::IsNotResponsible);
    wait_for(&handle, OperatorState::Idle).await;
    let err = handle.request_update(vec!["h1".into()]).await.unwrap_err();
    assert!(matches!(err, SyncError::NotResponsible("host")));

    // a new responsibility period computes a fresh delta
    fixture.put_hosts(&["h2"]);
    fixture.ha.notify(HaNotification::IsResponsible);
    wait_for(&handle, OperatorState::Synced).await;
    let ids: Vec<_> = fixture.db.ids("host").into_iter().collect();
    assert_eq!(ids, TestFixture::ids(&["h1", "h2"]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_late_start_receives_current_state() {
    init_logging();
    let fixture = TestFixture::new();
    fixture.put_hosts(&["h1"]);
    fixture.ha.notify(HaNotification::IsResponsible);

    let running = engine(&fixture, &["host"]);
    wait_for(running.handle("host").unwrap(), OperatorState::Synced).await;
    assert_eq!(fixture.db.ids("host").len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fetch_failure_fails_fast() {
    init_logging();
    let fixture = TestFixture::new();
    fixture.put_hosts(&["h1"]);
    fixture.db.set_fail_fetch(true);

    let running = engine(&fixture, &["host"]);
    fixture.ha.notify(HaNotification::IsResponsible);

    let err = tokio::time::timeout(Duration::from_secs(10), running.wait())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Sync(SyncError::Fetch {
            object_type: "host",
            side: StoreSide::Relational,
            ..
        })
    ));
    assert!(fixture.db.executed().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_exec_failure_fails_fast() {
    init_logging();
    let fixture = TestFixture::new();
    fixture.put_hosts(&["h1", "h2"]);
    fixture.db.set_fail_exec(true);

    let running = engine(&fixture, &["host"]);
    fixture.ha.notify(HaNotification::IsResponsible);

    let err = tokio::time::timeout(Duration::from_secs(10), running.wait())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Sync(SyncError::BulkExec {
            operation: Operation::Insert,
            ..
        })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_closing_ha_stops_engine() {
    init_logging();
    let fixture = TestFixture::new();
    let running = engine(&fixture, &["host", "hostgroup"]);

    fixture.ha.close();
    tokio::time::timeout(Duration::from_secs(10), running.wait())
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_large_sync_in_batches() {
    init_logging();
    let fixture = TestFixture::new();
    let names: Vec<String> = (0..1200).map(|i| format!("host-{:04}", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    fixture.put_hosts(&refs);
    fixture.seed_hosts(&refs[..300]);
    fixture.db.set_exec_delay(Some(Duration::from_millis(1)));

    let config = EngineConfig {
        object_types: vec!["host".into()],
        sync: icingadb_configsync::SyncConfig {
            batch_size: 100,
            chunk_size: 25,
            decode_workers: 4,
            ..Default::default()
        },
        ..EngineConfig::default()
    };
    let running = Engine::new(
        config,
        fixture.config_store(),
        fixture.db.clone(),
        Arc::clone(&fixture.ha),
    )
    .unwrap()
    .start();

    fixture.ha.notify(HaNotification::IsResponsible);
    wait_for(running.handle("host").unwrap(), OperatorState::Synced).await;

    assert_eq!(fixture.db.ids("host").len(), 1200);
    assert_eq!(fixture.db.executed_rows("host", Operation::Insert), 900);
    assert_eq!(fixture.db.executed_rows("host", Operation::Update), 300);
}

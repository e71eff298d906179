//! End-to-end scenarios across the engine, cache, and store.

use profsync_cache::{
    plan_warm_sections, CacheConfig, CacheManager, DeviceCapabilities, Lookup, Provenance,
};
use profsync_engine::{
    EngineConfig, EngineError, MockEndpoint, RemoteEndpoint, StopReason, SyncEngine, SyncStatus,
};
use profsync_protocol::{
    ConflictStrategy, ConnectionType, NetworkState, OperationPayload, QueuedOperation, ResolvedBy,
    SendOutcome, Timestamp,
};
use profsync_store::{DurableStore, MemoryStore};
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Barrier};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

fn engine_with(endpoint: MockEndpoint) -> SyncEngine<MockEndpoint> {
    init_tracing();
    let cache = Arc::new(CacheManager::new(CacheConfig::new()));
    let store = Arc::new(MemoryStore::new());
    SyncEngine::new(
        EngineConfig::new("u1"),
        endpoint,
        cache,
        store as Arc<dyn DurableStore>,
    )
}

fn online() -> NetworkState {
    NetworkState::online(ConnectionType::Wifi, 50_000, 15)
}

fn field_update(field: &str, value: serde_json::Value) -> OperationPayload {
    let mut fields = BTreeMap::new();
    fields.insert(field.to_string(), value);
    OperationPayload::UpdateProfile { fields }
}

#[test]
fn offline_queueing_then_reconnect_drains_in_priority_order() {
    let engine = engine_with(MockEndpoint::new());
    engine.set_network(NetworkState::offline());
    assert_eq!(engine.status(), SyncStatus::Offline);

    let low = engine
        .queue(field_update("bio", json!("low")), 2, false)
        .unwrap();
    let high = engine
        .queue(field_update("display_name", json!("high")), 9, true)
        .unwrap();
    let mid = engine
        .queue(field_update("location", json!("mid")), 5, true)
        .unwrap();

    // Queueing while offline does not leave the offline state.
    assert_eq!(engine.status(), SyncStatus::Offline);
    assert!(matches!(engine.drain(), Err(EngineError::Offline)));

    engine.set_network(online());
    assert_eq!(engine.status(), SyncStatus::Pending);

    let report = engine.drain().unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.final_status, SyncStatus::Synced);
    assert_eq!(engine.status(), SyncStatus::Synced);

    let sent: Vec<_> = engine.endpoint().sent().iter().map(|op| op.id).collect();
    assert_eq!(sent, vec![high.id, mid.id, low.id]);
}

#[test]
fn server_wins_conflict_is_auto_resolved() {
    let endpoint = MockEndpoint::new();
    endpoint.push_outcome(SendOutcome::Conflict {
        field_name: "display_name".to_string(),
        server_value: json!("Server Name"),
        server_timestamp: Timestamp::now(),
    });
    let cache = Arc::new(CacheManager::new(CacheConfig::new()));
    let store = Arc::new(MemoryStore::new());
    let engine = SyncEngine::new(
        EngineConfig::new("u1"),
        endpoint,
        Arc::clone(&cache),
        store as Arc<dyn DurableStore>,
    );
    engine.set_strategy(ConflictStrategy::ServerWins);
    engine.set_network(online());
    engine
        .queue(field_update("display_name", json!("Client Name")), 5, true)
        .unwrap();

    let report = engine.drain().unwrap();
    assert_eq!(report.conflicts_resolved.len(), 1);
    assert!(report.conflicts_unresolved.is_empty());
    assert_eq!(report.final_status, SyncStatus::Synced);

    // The server value is folded into the cache as confirmed data.
    match cache.get("u1/display_name") {
        Lookup::Hit(entry) => {
            assert_eq!(entry.provenance, Provenance::Confirmed);
            assert_eq!(entry.payload, b"\"Server Name\"");
        }
        other => panic!("expected confirmed hit, got {other:?}"),
    }

    let snap = engine.metrics();
    assert_eq!(snap.conflict_count, 1);
    assert_eq!(snap.auto_resolved_conflicts, 1);

    let ledger = engine.conflicts();
    assert_eq!(ledger.len(), 1);
    assert!(ledger[0].is_resolved());
}

#[test]
fn manual_conflict_blocks_until_resolved() {
    let endpoint = MockEndpoint::new();
    endpoint.push_outcome(SendOutcome::Conflict {
        field_name: "bio".to_string(),
        server_value: json!("B"),
        server_timestamp: Timestamp::now(),
    });
    let cache = Arc::new(CacheManager::new(CacheConfig::new()));
    let store = Arc::new(MemoryStore::new());
    let engine = SyncEngine::new(
        EngineConfig::new("u1"),
        endpoint,
        Arc::clone(&cache),
        store as Arc<dyn DurableStore>,
    );
    engine.set_strategy(ConflictStrategy::Manual);
    engine.set_network(online());
    engine.queue(field_update("bio", json!("A")), 5, true).unwrap();

    let report = engine.drain().unwrap();
    assert_eq!(report.conflicts_unresolved.len(), 1);
    assert_eq!(engine.status(), SyncStatus::Conflicted);
    assert_eq!(engine.unresolved_conflicts().len(), 1);

    let conflict_id = report.conflicts_unresolved[0];
    let resolved = engine
        .resolve_conflict(conflict_id, json!("C"), ResolvedBy::User("user-42".to_string()))
        .unwrap();
    assert!(resolved);
    assert_eq!(engine.status(), SyncStatus::Pending);
    assert!(engine.unresolved_conflicts().is_empty());

    // A second resolution of the same conflict is a no-op.
    assert!(!engine
        .resolve_conflict(conflict_id, json!("D"), ResolvedBy::Auto)
        .unwrap());

    // Nothing left queued, so evaluation settles into Synced.
    assert_eq!(engine.evaluate_status(), SyncStatus::Synced);

    match cache.get("u1/bio") {
        Lookup::Hit(entry) => {
            assert_eq!(entry.provenance, Provenance::Confirmed);
            assert_eq!(entry.payload, b"\"C\"");
        }
        other => panic!("expected confirmed hit, got {other:?}"),
    }
    assert_eq!(engine.metrics().manual_resolved_conflicts, 1);
}

#[test]
fn last_modified_wins_prefers_strictly_newer_client() {
    let endpoint = MockEndpoint::new();
    endpoint.push_outcome(SendOutcome::Conflict {
        field_name: "location".to_string(),
        server_value: json!("Berlin"),
        // Older than any enqueue timestamp this test can produce.
        server_timestamp: Timestamp(0),
    });
    let cache = Arc::new(CacheManager::new(CacheConfig::new()));
    let store = Arc::new(MemoryStore::new());
    let engine = SyncEngine::new(
        EngineConfig::new("u1"),
        endpoint,
        Arc::clone(&cache),
        store as Arc<dyn DurableStore>,
    );
    engine.set_network(online());
    engine
        .queue(field_update("location", json!("Lisbon")), 5, true)
        .unwrap();

    let report = engine.drain().unwrap();
    assert_eq!(report.conflicts_resolved.len(), 1);
    match cache.get("u1/location") {
        Lookup::Hit(entry) => assert_eq!(entry.payload, b"\"Lisbon\""),
        other => panic!("expected hit, got {other:?}"),
    }
}

struct StallingEndpoint {
    barrier: Arc<Barrier>,
}

impl RemoteEndpoint for StallingEndpoint {
    fn send(&self, _operation: &QueuedOperation) -> profsync_engine::EngineResult<SendOutcome> {
        self.barrier.wait();
        self.barrier.wait();
        Ok(SendOutcome::ok())
    }
}

#[test]
fn offline_flip_mid_drain_leaves_remaining_queue() {
    let barrier = Arc::new(Barrier::new(2));
    let cache = Arc::new(CacheManager::new(CacheConfig::new()));
    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(SyncEngine::new(
        EngineConfig::new("u1"),
        StallingEndpoint {
            barrier: Arc::clone(&barrier),
        },
        cache,
        store as Arc<dyn DurableStore>,
    ));
    engine.set_network(online());
    engine.queue(field_update("bio", json!("a")), 5, false).unwrap();
    engine.queue(field_update("location", json!("b")), 5, false).unwrap();

    let worker = {
        let engine = Arc::clone(&engine);
        std::thread::spawn(move || engine.drain())
    };

    // Wait until the drain is inside the first delivery, flip offline,
    // then release it.
    barrier.wait();
    engine.set_network(NetworkState::offline());
    barrier.wait();

    let report = worker.join().unwrap().unwrap();
    assert_eq!(report.stopped, Some(StopReason::WentOffline));
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.final_status, SyncStatus::Offline);
    assert_eq!(engine.status(), SyncStatus::Offline);
    assert_eq!(engine.queue_len(), 1);
}

struct SelfCancellingEndpoint {
    cancel: parking_lot::Mutex<Option<profsync_engine::CancelHandle>>,
}

impl RemoteEndpoint for SelfCancellingEndpoint {
    fn send(&self, _operation: &QueuedOperation) -> profsync_engine::EngineResult<SendOutcome> {
        if let Some(handle) = self.cancel.lock().as_ref() {
            handle.cancel();
        }
        Ok(SendOutcome::ok())
    }
}

#[test]
fn cancellation_stops_between_operations() {
    let cache = Arc::new(CacheManager::new(CacheConfig::new()));
    let store = Arc::new(MemoryStore::new());
    let engine = SyncEngine::new(
        EngineConfig::new("u1"),
        SelfCancellingEndpoint {
            cancel: parking_lot::Mutex::new(None),
        },
        cache,
        store as Arc<dyn DurableStore>,
    );
    // Wire the engine's own handle into the endpoint so the first
    // delivery cancels the drain.
    *engine.endpoint().cancel.lock() = Some(engine.cancel_handle());

    engine.set_network(online());
    let first = engine.queue(field_update("bio", json!("a")), 5, false).unwrap();
    let second = engine
        .queue(field_update("location", json!("b")), 5, false)
        .unwrap();

    let report = engine.drain().unwrap();
    assert_eq!(report.stopped, Some(StopReason::Cancelled));
    assert_eq!(report.succeeded, vec![first.id]);
    assert_eq!(report.final_status, SyncStatus::Pending);
    assert_eq!(engine.queue_len(), 1);

    // The untouched operation goes out on the next drain.
    *engine.endpoint().cancel.lock() = None;
    let report = engine.drain().unwrap();
    assert_eq!(report.succeeded, vec![second.id]);
    assert_eq!(engine.status(), SyncStatus::Synced);
}

#[test]
fn warm_up_planning_reacts_to_sync_pressure() {
    let endpoint = MockEndpoint::new();
    let cache = Arc::new(CacheManager::new(CacheConfig::new()));
    let store = Arc::new(MemoryStore::new());
    let engine = SyncEngine::new(
        EngineConfig::new("u1"),
        endpoint,
        Arc::clone(&cache),
        store as Arc<dyn DurableStore>,
    );
    engine.set_network(NetworkState::offline());
    for i in 0..6 {
        engine
            .queue(field_update("bio", json!(format!("v{i}"))), 5, false)
            .unwrap();
    }

    let requested = vec![
        "basic_info".to_string(),
        "analytics".to_string(),
        "avatar".to_string(),
    ];
    let plan = plan_warm_sections(
        &requested,
        &DeviceCapabilities::unconstrained(),
        engine.sync_load(),
        cache.config(),
    );
    // A busy queue drops heavyweight sections from the warm-up plan.
    assert_eq!(plan, vec!["basic_info".to_string(), "avatar".to_string()]);
}

proptest! {
    /// Drain order is priority-descending, FIFO among equal priorities.
    #[test]
    fn drain_order_is_priority_then_fifo(priorities in proptest::collection::vec(1u8..=10, 1..20)) {
        let engine = engine_with(MockEndpoint::new());
        engine.set_network(online());

        let mut expected = Vec::new();
        for (index, &priority) in priorities.iter().enumerate() {
            let op = engine.queue(field_update("bio", json!(index)), priority, false).unwrap();
            expected.push((priority, op.id));
        }
        // Stable sort preserves enqueue order within a priority.
        expected.sort_by(|a, b| b.0.cmp(&a.0));

        engine.drain().unwrap();
        let got: Vec<_> = engine.endpoint().sent().iter().map(|op| op.id).collect();
        let want: Vec<_> = expected.iter().map(|(_, id)| *id).collect();
        prop_assert_eq!(got, want);
        prop_assert_eq!(engine.status(), SyncStatus::Synced);
    }

    /// `retry_count` never exceeds `max_retries`, and an exhausted
    /// operation lands in the failed list exactly once.
    #[test]
    fn retry_bound_is_hard(max_retries in 0u32..4) {
        let endpoint = MockEndpoint::new();
        for _ in 0..=max_retries + 2 {
            endpoint.push_outcome(SendOutcome::transient("down"));
        }
        let cache = Arc::new(CacheManager::new(CacheConfig::new()));
        let store = Arc::new(MemoryStore::new());
        let engine = SyncEngine::new(
            EngineConfig::new("u1").with_default_max_retries(max_retries),
            endpoint,
            cache,
            store as Arc<dyn DurableStore>,
        );
        engine.set_network(online());
        engine.queue(field_update("bio", json!("x")), 5, false).unwrap();

        // One attempt per drain; after max_retries + 1 attempts the
        // operation is permanently failed.
        for _ in 0..=max_retries {
            engine.drain().unwrap();
        }
        let failed = engine.failed_operations();
        prop_assert_eq!(failed.len(), 1);
        prop_assert!(failed[0].retry_count <= failed[0].max_retries);
        prop_assert_eq!(engine.status(), SyncStatus::Failed);

        // Further drains do not duplicate the failure.
        engine.drain().unwrap();
        prop_assert_eq!(engine.failed_operations().len(), 1);
    }
}

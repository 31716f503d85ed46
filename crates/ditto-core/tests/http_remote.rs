//! End-to-end sync against a local HTTP endpoint.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use ditto_core::config::SyncSettings;
use ditto_core::sync::{HttpRemote, SyncEngine, SyncOutcome};
use ditto_core::{Operation, SyncStatus, TaskStore};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Recorder {
    bodies: Arc<Mutex<Vec<Value>>>,
    statuses: Arc<Mutex<VecDeque<StatusCode>>>,
    delay: Option<Duration>,
}

impl Recorder {
    fn answering(statuses: &[StatusCode]) -> Self {
        let recorder = Self::default();
        recorder
            .statuses
            .lock()
            .unwrap()
            .extend(statuses.iter().copied());
        recorder
    }

    fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }
}

async fn record(
    State(recorder): State<Recorder>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    recorder.bodies.lock().unwrap().push(body);
    if let Some(delay) = recorder.delay {
        tokio::time::sleep(delay).await;
    }
    let status = recorder
        .statuses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or(StatusCode::OK);
    if status.is_success() {
        (status, Json(json!({ "ok": true })))
    } else {
        (status, Json(json!({ "error": "storage unavailable" })))
    }
}

async fn serve(recorder: Recorder) -> String {
    let router = Router::new()
        .route("/api/todos/sync", post(record))
        .with_state(recorder);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api/todos/sync")
}

async fn engine_for(endpoint: &str, timeout: Duration) -> SyncEngine<HttpRemote> {
    let settings = SyncSettings::new(endpoint)
        .unwrap()
        .with_timeout(timeout)
        .unwrap();
    let remote = HttpRemote::new(&settings).unwrap();
    SyncEngine::new(TaskStore::open_in_memory().await.unwrap(), remote)
}

#[tokio::test(flavor = "multi_thread")]
async fn accepted_batch_reconciles_local_state() {
    let recorder = Recorder::default();
    let endpoint = serve(recorder.clone()).await;
    let engine = engine_for(&endpoint, Duration::from_secs(5)).await;
    let store = engine.store().clone();

    let milk = store.create("buy milk").await.unwrap();
    let bread = store.create("bake bread").await.unwrap();
    store.toggle(&milk.client_id).await.unwrap();
    store.delete(&bread.client_id).await.unwrap();
    let queued = store.pending_entries().await.unwrap();

    let outcome = engine.run_cycle().await;

    assert_eq!(
        outcome,
        SyncOutcome::Synced {
            sent: 3,
            carried_over: false
        }
    );
    assert_eq!(store.pending_count().await.unwrap(), 0);
    assert_eq!(
        store.get(&milk.client_id).await.unwrap().unwrap().sync_status,
        SyncStatus::Synced
    );

    let bodies = recorder.bodies();
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        bodies[0],
        json!({
            "todos": [
                {
                    "clientId": milk.client_id.to_string(),
                    "task": "buy milk",
                    "completed": false,
                    "deleted": false,
                    "updatedAt": queued[0].created_at,
                },
                {
                    "clientId": milk.client_id.to_string(),
                    "completed": true,
                    "updatedAt": queued[1].created_at,
                },
                {
                    "clientId": bread.client_id.to_string(),
                    "deleted": true,
                    "updatedAt": queued[2].created_at,
                },
            ]
        })
    );
    assert_eq!(queued[0].operation, Operation::Create);
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_keeps_everything_queued() {
    let recorder = Recorder::answering(&[StatusCode::INTERNAL_SERVER_ERROR]);
    let endpoint = serve(recorder.clone()).await;
    let engine = engine_for(&endpoint, Duration::from_secs(5)).await;
    let store = engine.store().clone();
    store.create("buy milk").await.unwrap();
    let tasks_before = store.list_tasks().await.unwrap();
    let outbox_before = store.pending_entries().await.unwrap();

    let outcome = engine.run_cycle().await;

    let SyncOutcome::Failed { reason } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(reason.contains("storage unavailable"));
    assert!(reason.contains("500"));
    assert_eq!(store.list_tasks().await.unwrap(), tasks_before);
    assert_eq!(store.pending_entries().await.unwrap(), outbox_before);

    assert!(engine.run_cycle().await.is_synced());
    let bodies = recorder.bodies();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0], bodies[1]);
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_endpoint_times_out_as_failure() {
    let recorder = Recorder {
        delay: Some(Duration::from_secs(3)),
        ..Recorder::default()
    };
    let endpoint = serve(recorder).await;
    let engine = engine_for(&endpoint, Duration::from_millis(200)).await;
    let store = engine.store().clone();
    store.create("buy milk").await.unwrap();

    let outcome = engine.run_cycle().await;

    assert!(matches!(outcome, SyncOutcome::Failed { .. }));
    assert_eq!(store.pending_count().await.unwrap(), 1);
    assert!(!store.list_live().await.unwrap()[0].synced);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_endpoint_is_a_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let engine = engine_for(&format!("http://{addr}/sync"), Duration::from_secs(2)).await;
    engine.store().create("offline").await.unwrap();

    assert!(matches!(engine.run_cycle().await, SyncOutcome::Failed { .. }));
    assert_eq!(engine.store().pending_count().await.unwrap(), 1);
}

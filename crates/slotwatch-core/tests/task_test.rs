#![allow(clippy::unwrap_used)]
// Integration tests for the cron task lifecycle against a mock node.

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use slotwatch_core::{CoreError, EntityId, Mirror, MirrorConfig, StopOutcome, TaskKind};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Mirror) {
    let server = MockServer::start().await;
    let config = MirrorConfig::for_node(Url::parse(&server.uri()).unwrap());
    let mirror = Mirror::new(config).unwrap();
    mirror.register_entity(id("e1"), "One", "pool");
    (server, mirror)
}

fn id(raw: &str) -> EntityId {
    raw.parse().unwrap()
}

async fn mount_once(server: &MockServer, entity: &str, task_id: &str) {
    Mock::given(method("GET"))
        .and(path("/~cron@1.0/once"))
        .and(query_param("cron-path", format!("/{entity}~process@1.0/now")))
        .respond_with(ResponseTemplate::new(200).set_body_string(task_id))
        .mount(server)
        .await;
}

// ── Start ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_once_then_stale_stop_then_no_active_task() {
    let (server, mirror) = setup().await;
    mount_once(&server, "e1", "abc").await;
    Mock::given(method("GET"))
        .and(path("/~cron@1.0/stop"))
        .and(query_param("task", "abc"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Task not found: abc"))
        .expect(1)
        .mount(&server)
        .await;

    let binding = mirror.start_task(&id("e1"), TaskKind::Once).await.unwrap();
    assert_eq!(binding.task_id, "abc");
    assert_eq!(binding.kind, TaskKind::Once);
    assert_eq!(mirror.snapshot(&id("e1")).unwrap().task, Some(binding));

    let outcome = mirror.stop_task(&id("e1")).await.unwrap();
    assert_eq!(outcome, StopOutcome::StaleTaskCleared);
    assert!(mirror.snapshot(&id("e1")).unwrap().task.is_none());

    let again = mirror.stop_task(&id("e1")).await;
    assert!(matches!(again, Err(CoreError::NoActiveTask { .. })));
}

#[tokio::test]
async fn test_every_sends_interval_and_trims_task_id() {
    let (server, mirror) = setup().await;
    Mock::given(method("GET"))
        .and(path("/~cron@1.0/every"))
        .and(query_param("cron-path", "/e1~process@1.0/now"))
        .and(query_param("interval", "5-minutes"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  t-every\n"))
        .expect(1)
        .mount(&server)
        .await;

    let binding = mirror.start_task(&id("e1"), TaskKind::Every).await.unwrap();
    assert_eq!(binding.task_id, "t-every");
    assert_eq!(binding.kind, TaskKind::Every);
}

#[tokio::test]
async fn test_start_overwrites_existing_binding() {
    let (server, mirror) = setup().await;
    mount_once(&server, "e1", "first").await;
    mirror.start_task(&id("e1"), TaskKind::Once).await.unwrap();

    server.reset().await;
    mount_once(&server, "e1", "second").await;
    mirror.start_task(&id("e1"), TaskKind::Once).await.unwrap();

    let task = mirror.snapshot(&id("e1")).unwrap().task.unwrap();
    assert_eq!(task.task_id, "second");
}

#[tokio::test]
async fn test_start_failure_leaves_binding_untouched() {
    let (server, mirror) = setup().await;
    mount_once(&server, "e1", "keep").await;
    mirror.start_task(&id("e1"), TaskKind::Once).await.unwrap();

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/~cron@1.0/every"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let err = mirror.start_task(&id("e1"), TaskKind::Every).await.unwrap_err();
    assert_eq!(err.upstream_status(), Some(503));
    assert_eq!(mirror.snapshot(&id("e1")).unwrap().task.unwrap().task_id, "keep");
}

#[tokio::test]
async fn test_start_empty_task_id_is_malformed() {
    let (server, mirror) = setup().await;
    mount_once(&server, "e1", "   ").await;

    let result = mirror.start_task(&id("e1"), TaskKind::Once).await;
    assert!(matches!(result, Err(CoreError::MalformedResponse { .. })));
    assert!(mirror.snapshot(&id("e1")).unwrap().task.is_none());
}

#[tokio::test]
async fn test_start_unknown_entity_makes_no_request() {
    let (server, mirror) = setup().await;

    let result = mirror.start_task(&id("ghost"), TaskKind::Once).await;
    assert!(matches!(result, Err(CoreError::EntityNotFound { .. })));
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ── Stop ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stop_without_binding_makes_no_request() {
    let (server, mirror) = setup().await;
    Mock::given(method("GET"))
        .and(path("/~cron@1.0/stop"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = mirror.stop_task(&id("e1")).await;
    assert!(matches!(result, Err(CoreError::NoActiveTask { .. })));
}

#[tokio::test]
async fn test_stop_success_clears_binding() {
    let (server, mirror) = setup().await;
    mount_once(&server, "e1", "abc").await;
    Mock::given(method("GET"))
        .and(path("/~cron@1.0/stop"))
        .and(query_param("task", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    mirror.start_task(&id("e1"), TaskKind::Once).await.unwrap();
    assert_eq!(mirror.stop_task(&id("e1")).await.unwrap(), StopOutcome::Stopped);
    assert!(mirror.snapshot(&id("e1")).unwrap().task.is_none());
}

#[tokio::test]
async fn test_stop_server_error_keeps_binding() {
    let (server, mirror) = setup().await;
    mount_once(&server, "e1", "abc").await;
    Mock::given(method("GET"))
        .and(path("/~cron@1.0/stop"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    mirror.start_task(&id("e1"), TaskKind::Once).await.unwrap();
    let err = mirror.stop_task(&id("e1")).await.unwrap_err();
    assert_eq!(err.upstream_status(), Some(500));
    assert_eq!(mirror.snapshot(&id("e1")).unwrap().task.unwrap().task_id, "abc");
}

// ── Reconcile ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_reconcile_clears_only_unlisted_bindings() {
    let (server, mirror) = setup().await;
    mirror.register_entity(id("e2"), "Two", "pool");
    mirror.register_entity(id("e3"), "Three", "pool");
    mount_once(&server, "e1", "live").await;
    mount_once(&server, "e2", "gone").await;
    Mock::given(method("GET"))
        .and(path("/~cron@1.0/list/serialize~json@1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "device": "cron@1.0",
            "body": [
                {
                    "created_at": 1_700_000_000_u64,
                    "path": "/e1~process@1.0/now",
                    "pid": "<0.1.0>",
                    "task_id": "live",
                    "type": "once"
                }
            ]
        })))
        .mount(&server)
        .await;

    mirror.start_task(&id("e1"), TaskKind::Once).await.unwrap();
    mirror.start_task(&id("e2"), TaskKind::Once).await.unwrap();

    let report = mirror.reconcile_tasks().await.unwrap();
    assert_eq!(report.kept, 1);
    assert_eq!(report.cleared, vec![id("e2")]);

    assert!(mirror.snapshot(&id("e1")).unwrap().task.is_some());
    assert!(mirror.snapshot(&id("e2")).unwrap().task.is_none());
    assert!(mirror.snapshot(&id("e3")).unwrap().task.is_none());
}

#[tokio::test]
async fn test_reconcile_list_failure_clears_nothing() {
    let (server, mirror) = setup().await;
    mount_once(&server, "e1", "abc").await;
    Mock::given(method("GET"))
        .and(path("/~cron@1.0/list/serialize~json@1.0"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    mirror.start_task(&id("e1"), TaskKind::Once).await.unwrap();
    assert!(mirror.reconcile_tasks().await.is_err());
    assert!(mirror.snapshot(&id("e1")).unwrap().task.is_some());
}

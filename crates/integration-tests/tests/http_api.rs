//! HTTP API end to end: router + queue manager + SQLite users

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use courier_api_http::{router, AppState, QueueDefaults};
use courier_core::application::{QueueManager, RegistrationService};
use courier_core::port::broker::mocks::InMemoryBroker;
use courier_core::port::id_provider::UuidProvider;
use courier_core::port::message_handler::mocks::RecordingHandler;
use courier_core::port::time_provider::SystemTimeProvider;
use courier_infra_sqlite::{create_pool, run_migrations, SqliteUserRepository};
use serde_json::{json, Value};
use tower::ServiceExt;

struct App {
    router: Router,
    broker: InMemoryBroker,
    handler: Arc<RecordingHandler>,
    queues: Arc<QueueManager>,
}

async fn app() -> App {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();

    let broker = InMemoryBroker::new();
    let queues = Arc::new(QueueManager::new(Arc::new(broker.clone())));
    let handler = Arc::new(RecordingHandler::new_success());
    let users = Arc::new(RegistrationService::new(
        Arc::new(SqliteUserRepository::new(pool)),
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
    ));

    let state = AppState::new(queues.clone(), users, handler.clone()).with_defaults(QueueDefaults {
        producers: 3,
        consumers: 3,
    });

    App {
        router: router(state),
        broker,
        handler,
        queues,
    }
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
    };
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_publish_reaches_handler() {
    let app = app().await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/publish",
        Some(json!({"queueName": "orders", "event": "order-1"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queueName"], "orders");
    assert!(app.handler.wait_for_calls(1, Duration::from_secs(2)).await);
    assert_eq!(app.handler.received(), vec!["order-1".to_string()]);

    let (status, queues) = send(&app.router, "GET", "/api/v1/queues", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queues.as_array().unwrap().len(), 1);
    assert_eq!(queues[0]["producers"], 3);
    assert_eq!(queues[0]["consumers"], 3);

    app.queues.shutdown().await.unwrap();
    assert_eq!(app.broker.published("orders").len(), 1);
}

#[tokio::test]
async fn test_publish_bad_requests() {
    let app = app().await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/publish",
        Some(json!({"queueName": "orders"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/v1/publish",
        Some(json!({"queueName": 7, "event": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(!app.queues.is_defined("orders"));
}

#[tokio::test]
async fn test_register_then_lookup() {
    let app = app().await;

    let (status, created) = send(
        &app.router,
        "POST",
        "/api/v1/register",
        Some(json!({"name": "John Doe", "email": "johndoe@example.com", "password": "securepassword"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created.get("passwordHash").is_none());
    assert!(created.get("password_hash").is_none());

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = send(&app.router, "GET", &format!("/api/v1/users/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    // Same email again hits the UNIQUE constraint
    let (status, _) = send(
        &app.router,
        "POST",
        "/api/v1/register",
        Some(json!({"name": "John", "email": "johndoe@example.com", "password": "other"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_missing_fields() {
    let app = app().await;

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/v1/register",
        Some(json!({"name": "John Doe", "email": "johndoe@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, body) = send(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

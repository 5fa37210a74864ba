//! HTTP Server
//!
//! axum router over the queue manager and the user service.

use crate::handler;
use axum::routing::{get, post};
use axum::Router;
use courier_core::application::{QueueManager, UserService};
use courier_core::error::Result;
use courier_core::port::MessageHandler;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
const DEFAULT_HTTP_PORT: u16 = 8080;

/// HTTP Server Configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
        }
    }
}

/// Pool sizes used when the publish route declares a queue
#[derive(Debug, Clone, Copy)]
pub struct QueueDefaults {
    pub producers: usize,
    pub consumers: usize,
}

impl Default for QueueDefaults {
    fn default() -> Self {
        Self {
            producers: 3,
            consumers: 3,
        }
    }
}

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub queues: Arc<QueueManager>,
    pub users: Arc<dyn UserService>,
    /// Processing callback bound to queues declared through the publish route
    pub handler: Arc<dyn MessageHandler>,
    pub defaults: QueueDefaults,
}

impl AppState {
    pub fn new(
        queues: Arc<QueueManager>,
        users: Arc<dyn UserService>,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            queues,
            users,
            handler,
            defaults: QueueDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: QueueDefaults) -> Self {
        self.defaults = defaults;
        self
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/publish", post(handler::publish))
        .route("/api/v1/register", post(handler::register))
        .route("/api/v1/users/:id", get(handler::get_user))
        .route("/api/v1/queues", get(handler::list_queues))
        .route("/health", get(handler::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTTP Server
pub struct HttpServer {
    config: HttpServerConfig,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Bind and serve until `shutdown` resolves.
    ///
    /// Returns the bound address (useful with port 0) and the serving task.
    pub async fn start<F>(self, shutdown: F) -> Result<(SocketAddr, JoinHandle<()>)>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, "Starting HTTP server");

        let app = router(self.state);
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "HTTP server terminated with error");
            }
            info!("HTTP server stopped");
        });

        Ok((local_addr, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HealthResponse, PublishResponse, UserResponse};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use courier_core::application::RegistrationService;
    use courier_core::domain::User;
    use courier_core::error::AppError;
    use courier_core::port::broker::mocks::InMemoryBroker;
    use courier_core::port::id_provider::mocks::SequentialIdProvider;
    use courier_core::port::message_handler::mocks::RecordingHandler;
    use courier_core::port::time_provider::mocks::FixedTimeProvider;
    use courier_core::port::user_repository::mocks::InMemoryUserRepository;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt; // for `app.oneshot()`

    /// Counts calls and delegates to a real registration service
    struct CountingUserService {
        inner: RegistrationService,
        add_calls: AtomicUsize,
        fail: bool,
    }

    impl CountingUserService {
        fn new(fail: bool) -> Self {
            Self {
                inner: RegistrationService::new(
                    Arc::new(InMemoryUserRepository::new()),
                    Arc::new(SequentialIdProvider::new("user")),
                    Arc::new(FixedTimeProvider(1_700_000_000_000)),
                ),
                add_calls: AtomicUsize::new(0),
                fail,
            }
        }

        fn add_calls(&self) -> usize {
            self.add_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UserService for CountingUserService {
        async fn add_user(&self, name: &str, email: &str, password: &str) -> Result<User> {
            self.add_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Database("connection reset".to_string()));
            }
            self.inner.add_user(name, email, password).await
        }

        async fn get_user(&self, id: &str) -> Result<Option<User>> {
            self.inner.get_user(id).await
        }
    }

    struct Harness {
        broker: InMemoryBroker,
        users: Arc<CountingUserService>,
        handler: Arc<RecordingHandler>,
        app: Router,
    }

    fn harness_with(users: CountingUserService) -> Harness {
        let broker = InMemoryBroker::new();
        let users = Arc::new(users);
        let handler = Arc::new(RecordingHandler::new_success());
        let state = AppState::new(
            Arc::new(QueueManager::new(Arc::new(broker.clone()))),
            users.clone(),
            handler.clone(),
        )
        .with_defaults(QueueDefaults {
            producers: 2,
            consumers: 1,
        });
        Harness {
            broker,
            users,
            handler,
            app: router(state),
        }
    }

    fn harness() -> Harness {
        harness_with(CountingUserService::new(false))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_publish_declares_and_sends() {
        let h = harness();

        let response = h
            .app
            .clone()
            .oneshot(post_json(
                "/api/v1/publish",
                r#"{"queueName":"orders","event":"order-1"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: PublishResponse = body_json(response).await;
        assert_eq!(body.queue_name, "orders");

        assert!(h.handler.wait_for_calls(1, Duration::from_secs(2)).await);
        assert_eq!(h.handler.received(), vec!["order-1".to_string()]);
        assert_eq!(h.broker.published("orders"), vec!["order-1".to_string()]);
        assert_eq!(h.broker.declare_count("orders"), 1);
    }

    #[tokio::test]
    async fn test_publish_twice_declares_once() {
        let h = harness();

        for event in ["a", "b"] {
            let body = format!(r#"{{"queueName":"orders","event":"{}"}}"#, event);
            let response = h
                .app
                .clone()
                .oneshot(post_json("/api/v1/publish", &body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert!(h.handler.wait_for_calls(2, Duration::from_secs(2)).await);
        assert_eq!(h.broker.declare_count("orders"), 1);
    }

    #[tokio::test]
    async fn test_publish_rejects_missing_fields() {
        let h = harness();

        for body in [
            r#"{"queueName":"orders"}"#,
            r#"{"event":"x"}"#,
            r#"{"queueName":"","event":"x"}"#,
            r#"{not json"#,
            "",
        ] {
            let response = h
                .app
                .clone()
                .oneshot(post_json("/api/v1/publish", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        }
        assert_eq!(h.broker.declare_count("orders"), 0);
    }

    #[tokio::test]
    async fn test_publish_declare_failure_is_500() {
        let h = harness();
        h.broker.fail_declare(true);

        let response = h
            .app
            .clone()
            .oneshot(post_json(
                "/api/v1/publish",
                r#"{"queueName":"orders","event":"x"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = body_json(response).await;
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("failed to define queue"));
    }

    #[tokio::test]
    async fn test_register_created_calls_service_once() {
        let h = harness();

        let response = h
            .app
            .clone()
            .oneshot(post_json(
                "/api/v1/register",
                r#"{"name":"John Doe","email":"johndoe@example.com","password":"securepassword"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let user: UserResponse = body_json(response).await;
        assert_eq!(user.name, "John Doe");
        assert_eq!(user.email, "johndoe@example.com");
        assert_eq!(h.users.add_calls(), 1);
    }

    #[tokio::test]
    async fn test_register_empty_fields_is_400_without_service_call() {
        let h = harness();

        for body in [
            r#"{"name":"","email":"a@b.c","password":"pw"}"#,
            r#"{"name":"A","email":"","password":"pw"}"#,
            r#"{"name":"A","email":"a@b.c","password":""}"#,
            r#"{}"#,
            r#"[1,2"#,
        ] {
            let response = h
                .app
                .clone()
                .oneshot(post_json("/api/v1/register", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        }
        assert_eq!(h.users.add_calls(), 0);
    }

    #[tokio::test]
    async fn test_register_service_failure_is_500() {
        let h = harness_with(CountingUserService::new(true));

        let response = h
            .app
            .clone()
            .oneshot(post_json(
                "/api/v1/register",
                r#"{"name":"A","email":"a@b.c","password":"pw"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(h.users.add_calls(), 1);
    }

    #[tokio::test]
    async fn test_get_user_round_trip_and_404() {
        let h = harness();
        let response = h
            .app
            .clone()
            .oneshot(post_json(
                "/api/v1/register",
                r#"{"name":"Ada","email":"ada@example.com","password":"pw"}"#,
            ))
            .await
            .unwrap();
        let created: UserResponse = body_json(response).await;

        let response = h
            .app
            .clone()
            .oneshot(get(&format!("/api/v1/users/{}", created.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched: UserResponse = body_json(response).await;
        assert_eq!(fetched, created);

        let response = h
            .app
            .clone()
            .oneshot(get("/api/v1/users/missing"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_queues_and_health() {
        let h = harness();
        h.app
            .clone()
            .oneshot(post_json(
                "/api/v1/publish",
                r#"{"queueName":"orders","event":"x"}"#,
            ))
            .await
            .unwrap();

        let response = h.app.clone().oneshot(get("/api/v1/queues")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let queues: serde_json::Value = body_json(response).await;
        assert_eq!(queues[0]["name"], "orders");
        assert_eq!(queues[0]["producers"], 2);
        assert_eq!(queues[0]["consumers"], 1);

        let response = h.app.clone().oneshot(get("/health")).await.unwrap();
        let health: HealthResponse = body_json(response).await;
        assert_eq!(health.status, "ok");
    }

    #[tokio::test]
    async fn test_server_binds_ephemeral_port_and_stops() {
        let h = harness();
        let state = AppState::new(
            Arc::new(QueueManager::new(Arc::new(h.broker.clone()))),
            h.users.clone(),
            h.handler.clone(),
        );
        let server = HttpServer::new(
            HttpServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            state,
        );
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let (addr, handle) = server
            .start(async move {
                let _ = rx.await;
            })
            .await
            .unwrap();
        assert_ne!(addr.port(), 0);

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}

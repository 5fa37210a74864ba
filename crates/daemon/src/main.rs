//! Courier - Main Entry Point
//! HTTP publish/register API over RabbitMQ-backed queue pools

mod logging;
mod settings;
mod telemetry;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

// Import workspace crates
use courier_api_http::{AppState, HttpServer, HttpServerConfig, QueueDefaults};
use courier_core::application::queue_manager::shutdown_channel;
use courier_core::application::{DelayedLogHandler, QueueManager, RegistrationService};
use courier_core::port::id_provider::UuidProvider;
use courier_core::port::time_provider::SystemTimeProvider;
use courier_infra_amqp::AmqpBroker;
use courier_infra_sqlite::{create_pool, run_migrations, SqliteUserRepository};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const HTTP_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging (guard flushes the non-blocking writer on drop)
    let _log_guard = logging::init(logging::LogFormat::from_env())?;
    info!("Courier v{} starting...", VERSION);

    // 2. Configuration
    let settings = settings::Settings::load()?;
    info!(
        host = %settings.server.host,
        port = settings.server.port,
        producers = settings.queue.producers,
        consumers = settings.queue.consumers,
        buffer_capacity = settings.queue.buffer_capacity,
        "Configuration loaded"
    );

    // 3. Broker (unreachable broker is fatal at startup)
    let broker = Arc::new(
        AmqpBroker::connect(&settings.rabbitmq.url)
            .await
            .context("RabbitMQ connection failed")?,
    );

    // 4. Database
    info!(dsn = %settings.database.dsn, "Initializing database...");
    let pool = create_pool(&settings.database.dsn)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 5. Dependency wiring
    let user_service = Arc::new(RegistrationService::new(
        Arc::new(SqliteUserRepository::new(pool.clone())),
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
    ));
    let queues = Arc::new(QueueManager::with_buffer_capacity(
        broker,
        settings.queue.buffer_capacity,
    ));
    let handler = Arc::new(DelayedLogHandler::new(Duration::from_millis(
        settings.queue.handler_delay_ms,
    )));

    let state = AppState::new(queues.clone(), user_service, handler).with_defaults(QueueDefaults {
        producers: settings.queue.producers,
        consumers: settings.queue.consumers,
    });

    // 6. HTTP server
    let (stop_http, mut http_token) = shutdown_channel();
    let server = HttpServer::new(
        HttpServerConfig {
            host: settings.server.host.clone(),
            port: settings.server.port,
        },
        state,
    );
    let (addr, http_handle) = server
        .start(async move { http_token.wait().await })
        .await
        .context("HTTP server start failed")?;

    info!(addr = %addr, "System ready");
    info!("Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 8. Graceful shutdown: stop intake, then drain queues, then close stores
    stop_http.shutdown();
    if tokio::time::timeout(HTTP_DRAIN_TIMEOUT, http_handle)
        .await
        .is_err()
    {
        error!("HTTP server did not stop in time");
    }

    if let Err(e) = queues.shutdown().await {
        error!(error = %e, "Queue shutdown failed");
    }
    pool.close().await;
    telemetry::shutdown();

    info!("Shutdown complete.");
    Ok(())
}

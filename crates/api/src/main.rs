use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use afya_gateway::{HttpDownstream, IntegrationGateway, PgGatewayStore};
use afya_reminders::{HttpReminderSender, PgReminderStore, ReminderDispatcher};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use afya_api::background;
use afya_api::config::ServerConfig;
use afya_api::router::build_app_router;
use afya_api::state::{build_rate_limiter, AppState};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "afya_api=debug,afya_gateway=debug,afya_reminders=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        rate_limit_backend = ?config.rate_limit_backend,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = afya_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    afya_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    afya_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Gateway ---
    let limiter = build_rate_limiter(config.rate_limit_backend, &pool);
    let downstream = HttpDownstream::new().expect("Failed to build outbound HTTP client");
    let gateway = IntegrationGateway::new(
        Arc::new(PgGatewayStore::new(pool.clone())),
        Arc::clone(&limiter),
        Arc::new(downstream),
    );

    // --- Background tasks ---
    let cancel = CancellationToken::new();

    let cleanup_handle = tokio::spawn(background::rate_limit_cleanup::run(
        Arc::clone(&limiter),
        cancel.clone(),
    ));

    let retention_handle = tokio::spawn(background::violation_retention::run(
        pool.clone(),
        cancel.clone(),
    ));

    let dispatcher = ReminderDispatcher::new(
        Arc::new(PgReminderStore::new(pool.clone())),
        Arc::new(HttpReminderSender::new().expect("Failed to build reminder HTTP client")),
        Duration::from_secs(config.reminder_dispatch_interval_secs),
    );
    let dispatcher_cancel = cancel.clone();
    let dispatcher_handle = tokio::spawn(async move {
        dispatcher.run(dispatcher_cancel).await;
    });

    tracing::info!("Background tasks started (rate limit cleanup, violation retention, reminder dispatcher)");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        gateway,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(grace, dispatcher_handle).await.is_err() {
        tracing::warn!("Reminder dispatcher did not stop within the shutdown timeout");
    }
    let _ = tokio::time::timeout(grace, cleanup_handle).await;
    let _ = tokio::time::timeout(grace, retention_handle).await;
    tracing::info!("Background tasks stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

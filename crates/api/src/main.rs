use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use shotserver_core::dispatch::{DispatchStore, MemoryStore};
use shotserver_db::PgDispatchStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shotserver_api::config::{ServerConfig, StoreBackend};
use shotserver_api::router::build_app_router;
use shotserver_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shotserver_api=debug,shotserver_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        backend = ?config.store_backend,
        lease_ttl_secs = config.lease_ttl_secs,
        no_browser_policy = ?config.no_browser_policy,
        "Loaded server configuration",
    );

    // --- Store ---
    let store: Arc<dyn DispatchStore> = match config.store_backend {
        StoreBackend::Postgres => Arc::new(connect_postgres(&config).await),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; queued requests are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // --- Router ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let app = build_app_router(AppState::new(store, config));

    // --- Start server ---
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    // Flips once a termination signal arrives; starts the drain deadline.
    let (signal_tx, mut signal_rx) = tokio::sync::watch::channel(false);

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = signal_tx.send(true);
    });

    let drain_deadline = async move {
        let _ = signal_rx.wait_for(|fired| *fired).await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = async { server.await } => result.expect("Server error"),
        () = drain_deadline => {
            tracing::warn!("Shutdown timeout elapsed, dropping in-flight requests");
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// Connect, check, and migrate the PostgreSQL store.
async fn connect_postgres(config: &ServerConfig) -> PgDispatchStore {
    let database_url = config
        .database_url
        .as_deref()
        .expect("DATABASE_URL must be set for the postgres store backend");

    let pool = shotserver_db::create_pool(database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    shotserver_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    shotserver_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    PgDispatchStore::new(pool)
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
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

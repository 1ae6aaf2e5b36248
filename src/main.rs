use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use uuid_gate::limiter::{CounterStore, MemoryStore, RedisStore};
use uuid_gate::{AppState, Config, StoreBackend, build_router, utils};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting uuid_gate v{}", env!("CARGO_PKG_VERSION"));

    match run().await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Run the application, returning an exit code on error.
async fn run() -> Result<(), exitcode::ExitCode> {
    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {e}");
        exitcode::CONFIG
    })?;
    info!(
        host = %config.host,
        port = %config.port,
        backend = ?config.store_backend,
        "Configuration loaded"
    );

    // Construct the counting store for the configured backend
    let store: Arc<dyn CounterStore> = match config.store_backend {
        StoreBackend::Memory => {
            info!("Using in-memory counting store");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Redis => {
            info!(url = %config.redis_url, "Connecting to Redis counting store...");
            let store = RedisStore::connect(&config.redis_url).await.map_err(|e| {
                error!("Failed to connect to Redis: {e}");
                exitcode::UNAVAILABLE
            })?;
            // Fail fast if the store cannot answer before serving traffic
            store.ping().await.map_err(|e| {
                error!("Redis did not answer ping: {e}");
                exitcode::UNAVAILABLE
            })?;
            info!("Successfully connected to Redis");
            Arc::new(store)
        }
    };

    // Build application state and router
    let state = AppState::new(store, config.clone());
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET /generate - Generate a UUID (rate limited)");
    info!("  GET /health   - Health check");
    info!("  GET /ready    - Readiness check");

    // ConnectInfo supplies the peer address the key classifier falls back to
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(utils::shutdown_signal())
    .await
    .map_err(|e| {
        error!("Server error: {e}");
        exitcode::SOFTWARE
    })?;

    info!("Server shutdown complete");
    Ok(())
}

use tokio::signal;
use tracing::{error, info};

/// Resolve when the process should shut down (Ctrl+C or SIGTERM).
///
/// Used with `axum::serve(..).with_graceful_shutdown(..)` so in-flight
/// requests (and their store round-trips) complete before the listener
/// closes.
///
/// # Panics
///
/// Panics if a signal handler cannot be installed; without one the process
/// could never be stopped cleanly.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            panic!("cannot install Ctrl+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                panic!("cannot install SIGTERM signal handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal_name = tokio::select! {
        _ = ctrl_c => "Ctrl+C",
        _ = terminate => "SIGTERM",
    };

    info!("Received {signal_name}, shutting down gracefully...");
}

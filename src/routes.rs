//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (applied in order)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │  Rate Limiting   │ ← 429 if exceeded (protected routes only)
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← Adds X-Request-Id header
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response logging
//! └────────┬─────────┘
//!          │
//!          ▼
//!      Handler
//! ```
//!
//! # Route Groups
//!
//! - `/health`, `/ready` - probes, never rate limited
//! - `/generate` - the protected UUID generator

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::middleware::{RateLimitLayer, RequestIdLayer};
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
///
/// The enforcement layer wraps only the protected routes, so health probes
/// keep answering while a client is locked out (and while the store is down
/// in fail-closed mode).
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    info!(
        window_ms = config.window.as_millis() as u64,
        ip_limit = config.ip_limit_per_window,
        token_limit = config.token_limit_per_window,
        fail_open = config.fail_open,
        "Rate limiting configured"
    );

    let enforcement = RateLimitLayer::new(
        state.limiter.clone(),
        &config.token_header,
        config.fail_open,
    );

    let protected = Router::new()
        .route("/generate", get(handlers::generate_uuid))
        .route_layer(enforcement);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(RequestIdLayer::new())
        .with_state(state)
}

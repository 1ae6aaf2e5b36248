//! # uuid_gate
//!
//! A fixed-window rate limiting gateway in front of a UUID generation
//! endpoint, featuring:
//!
//! - **Per-class limits**: token-based and IP-based keys carry independent
//!   ceilings and lockout durations
//! - **Pluggable counting store**: in-memory for single instances and tests,
//!   Redis for shared deployments
//! - **Fail-closed enforcement**: a store outage yields server errors, never
//!   silently disabled protection (fail-open available as an explicit opt-in)
//! - **Observability**: request IDs, structured logging, health endpoints
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Rate Limit → Request ID → Trace)               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (generate, health, ready)                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RateLimiter (key classifier + limit policy)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CounterStore (memory / Redis, atomic per key)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use uuid_gate::{AppState, Config, MemoryStore, build_router};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let state = AppState::new(Arc::new(MemoryStore::new()), config);
//!     let app = build_router(state);
//!
//!     // Serve `app` with into_make_service_with_connect_info::<SocketAddr>()
//!     // so the limiter can fall back to the peer address.
//! }
//! ```
//!
//! ## Rate Limit Configuration
//!
//! ```bash
//! IP_LIMIT_PER_WINDOW=10 TOKEN_LIMIT_PER_WINDOW=100 \
//! RATE_LIMIT_BACKEND=redis REDIS_URL=redis://localhost:6379 cargo run
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

// Re-exports for convenience
pub use config::{Config, StoreBackend};
pub use error::{AppError, AppResult};
pub use limiter::{
    CounterStore, Decision, LimitPolicy, MemoryStore, RateLimiter, RedisStore, StoreError,
};
pub use routes::build_router;
pub use state::AppState;

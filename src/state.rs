//! Shared application state for Axum handlers.
//!
//! The counting store and the rate limiter are constructed once here and
//! injected explicitly wherever they are needed - no ambient or global store
//! lookups. The state is cloned per request; all shared pieces sit behind
//! `Arc`.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::limiter::{CounterStore, RateLimiter};

/// Shared application state for Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The rate limiting decision engine.
    pub limiter: Arc<RateLimiter>,
    /// The counting store, also used directly by health probes.
    pub store: Arc<dyn CounterStore>,
    /// Application configuration.
    pub config: Arc<Config>,
    /// Timestamp when the application started.
    pub started_at: Instant,
}

impl AppState {
    /// Create application state from a counting store and configuration.
    ///
    /// The limiter is built here from the config's limit policy and store
    /// timeout, sharing the given store.
    pub fn new(store: Arc<dyn CounterStore>, config: Config) -> Self {
        let limiter = Arc::new(RateLimiter::new(
            store.clone(),
            config.limit_policy(),
            config.store_timeout,
        ));

        Self {
            limiter,
            store,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

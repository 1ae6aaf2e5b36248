//! The rate limiting decision engine.
//!
//! Orchestrates classifier, policy, and counting store into one allow/deny
//! decision per request. The engine is constructed once with its store and
//! policy (explicit dependency injection, no ambient lookups) and shared
//! behind an `Arc`.
//!
//! Store failures - connectivity, protocol, timeout - surface as
//! [`StoreError`], never as an allow or deny. No retries happen here; a
//! failed store call is reported once and the enforcement layer chooses the
//! externally visible behavior.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::timeout;
use tracing::debug;

use super::key::classify;
use super::policy::LimitPolicy;
use super::store::{CounterStore, StoreError};

/// Outcome of a rate limit decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request may proceed to the protected handler.
    pub allowed: bool,

    /// Requests left in the current window, clamped to 0. Not meaningful
    /// when `limit` is 0 (unlimited).
    pub remaining: i64,

    /// The ceiling applied to this request's key class.
    pub limit: u32,

    /// When the client may retry. Set only on denial, one lockout duration
    /// from now.
    pub reset_at: Option<DateTime<Utc>>,
}

/// Fixed-window rate limiter over a counting store.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    policy: LimitPolicy,
    store_timeout: Duration,
}

impl RateLimiter {
    /// Create a limiter from its collaborators.
    ///
    /// `store_timeout` bounds every store round-trip; an elapsed timeout is
    /// reported as [`StoreError::Timeout`], not as a decision.
    pub fn new(store: Arc<dyn CounterStore>, policy: LimitPolicy, store_timeout: Duration) -> Self {
        Self {
            store,
            policy,
            store_timeout,
        }
    }

    /// The policy this limiter was constructed with.
    pub fn policy(&self) -> &LimitPolicy {
        &self.policy
    }

    /// Decide whether the request behind `key` is allowed, counting it in
    /// the same atomic step.
    ///
    /// The class (and with it the ceiling and lockout duration) is derived
    /// purely from the key's shape.
    ///
    /// # Errors
    ///
    /// Returns the store's error unchanged, or [`StoreError::Timeout`] when
    /// the round-trip exceeds the configured bound. Under cancellation the
    /// remote increment may already have taken effect; counting is
    /// at-least-once, not exactly-once.
    pub async fn decide(&self, key: &str) -> Result<Decision, StoreError> {
        let class = classify(key);
        let class_policy = self.policy.for_class(class);

        let outcome = timeout(
            self.store_timeout,
            self.store.check_and_increment(
                key,
                class_policy.max_requests,
                self.policy.window,
                class_policy.lockout,
            ),
        )
        .await
        .map_err(|_| StoreError::Timeout(self.store_timeout))??;

        debug!(
            key = %key,
            class = ?class,
            allowed = outcome.allowed,
            remaining = outcome.remaining,
            "Rate limit decision"
        );

        let reset_at = (!outcome.allowed)
            .then(|| Utc::now() + to_delta(class_policy.lockout));

        Ok(Decision {
            allowed: outcome.allowed,
            remaining: outcome.remaining.max(0),
            limit: class_policy.max_requests,
            reset_at,
        })
    }
}

fn to_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

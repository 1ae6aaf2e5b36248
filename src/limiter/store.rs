//! Counting store contract shared by all rate limit backends.
//!
//! A counting store owns two independent, separately expiring records per
//! identity key:
//!
//! - **Counter record**: request count within the current fixed window,
//!   created implicitly on the first request and deleted when the window
//!   expires.
//! - **Lockout record**: present only after a key has crossed its ceiling,
//!   expires after the lockout duration. Its presence is the sole lockout
//!   signal.
//!
//! Keeping the two orthogonal avoids a combined state machine that would have
//! to reconcile counter resets against lockout expiry.
//!
//! # Concurrency
//!
//! `check_and_increment` is the atomicity boundary: two concurrent calls for
//! the same key must never both observe "created with count = 1", and a
//! lockout write must never be lost when two requests cross the ceiling at
//! once (a lockout refresh is acceptable). The store is the only shared
//! mutable resource; callers perform no locking of their own.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a counting store backend.
///
/// A failed store call is never folded into an allow/deny outcome. The
/// enforcement layer decides what it means for the client (fail-open vs
/// fail-closed).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Unavailable(String),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Outcome of a single counted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Whether the request fits within the ceiling.
    pub allowed: bool,

    /// Requests left in the current window after this one. May be negative
    /// once the ceiling has been crossed, and is not meaningful when the
    /// ceiling is 0 (unlimited).
    pub remaining: i64,
}

/// Atomic counter-with-expiry primitive keyed by identity.
///
/// Any backend exposing atomic increment-with-expiry and a keyed
/// existence-with-TTL primitive can satisfy this contract; the crate ships an
/// in-memory backend and a Redis backend.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Count one request against `key` and decide whether it is allowed.
    ///
    /// In order:
    ///
    /// 1. If an unexpired lockout record exists, return denied immediately.
    ///    Locked keys are not charged further window consumption.
    /// 2. Atomically increment the counter, creating it with a fresh window
    ///    expiry (`window` from now) when this is the first request.
    /// 3. Allowed when `max_requests` is 0 (unlimited) or the post-increment
    ///    count is within `max_requests`.
    /// 4. On denial, write a lockout record expiring `lockout` from now. The
    ///    counter is left to expire naturally; the denied request stays
    ///    counted.
    async fn check_and_increment(
        &self,
        key: &str,
        max_requests: u32,
        window: Duration,
        lockout: Duration,
    ) -> Result<CheckOutcome, StoreError>;

    /// Whether an unexpired lockout record exists for `key`.
    async fn is_locked_out(&self, key: &str) -> Result<bool, StoreError>;

    /// Write a lockout record for `key` expiring `duration` from now,
    /// overwriting any existing one (last write wins).
    async fn set_lockout(&self, key: &str, duration: Duration) -> Result<(), StoreError>;

    /// Delete both the counter and lockout records for `key`, so the next
    /// request behaves as a first-ever request. Used by tests and
    /// administrative tooling, not by steady-state traffic.
    async fn reset(&self, key: &str) -> Result<(), StoreError>;

    /// Check backend connectivity. Used by health and readiness probes.
    async fn ping(&self) -> Result<(), StoreError>;
}

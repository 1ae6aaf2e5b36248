//! In-process counting store backed by `DashMap`.
//!
//! Counters and lockouts live in separate sharded maps, mirroring the two
//! independent records of the store contract. Per-key atomicity comes from
//! the `DashMap` entry API: the shard write lock is held across the
//! expired-window check and the increment, so two concurrent first requests
//! can never both observe "created with count = 1".
//!
//! Expired records are dropped lazily when their key is touched again; this
//! backend is intended for single-process deployments and tests, where the
//! working set of keys is small.
//!
//! TODO: sweep long-idle counter entries in the background once this backend
//! is used with high-cardinality key sets.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::store::{CheckOutcome, CounterStore, StoreError};

/// Counter record: request count plus the end of its fixed window.
#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    count: u64,
    window_ends: Instant,
}

/// In-memory counting store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    counters: DashMap<String, CounterEntry>,
    lockouts: DashMap<String, Instant>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn locked_until(&self, key: &str) -> Option<Instant> {
        self.lockouts.get(key).map(|entry| *entry)
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn check_and_increment(
        &self,
        key: &str,
        max_requests: u32,
        window: Duration,
        lockout: Duration,
    ) -> Result<CheckOutcome, StoreError> {
        let now = Instant::now();

        // Locked keys are denied without touching the counter.
        if let Some(until) = self.locked_until(key) {
            if now < until {
                return Ok(CheckOutcome {
                    allowed: false,
                    remaining: 0,
                });
            }
            self.lockouts.remove_if(key, |_, until| now >= *until);
        }

        // The entry guard holds the shard write lock, making the
        // window-rollover check and the increment one atomic step per key.
        let count = {
            let mut entry = self
                .counters
                .entry(key.to_owned())
                .or_insert(CounterEntry {
                    count: 0,
                    window_ends: now + window,
                });

            if now >= entry.window_ends {
                // Previous window expired; this request starts a fresh one.
                entry.count = 0;
                entry.window_ends = now + window;
            }

            entry.count += 1;
            entry.count
        };

        let allowed = max_requests == 0 || count <= u64::from(max_requests);
        if !allowed {
            // Unconditional overwrite: concurrent ceiling crossings refresh
            // the lockout rather than losing the write.
            self.lockouts.insert(key.to_owned(), now + lockout);
        }

        let remaining =
            i64::from(max_requests) - i64::try_from(count).unwrap_or(i64::MAX);

        Ok(CheckOutcome { allowed, remaining })
    }

    async fn is_locked_out(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .locked_until(key)
            .is_some_and(|until| Instant::now() < until))
    }

    async fn set_lockout(&self, key: &str, duration: Duration) -> Result<(), StoreError> {
        self.lockouts
            .insert(key.to_owned(), Instant::now() + duration);
        Ok(())
    }

    async fn reset(&self, key: &str) -> Result<(), StoreError> {
        self.counters.remove(key);
        self.lockouts.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    const WINDOW: Duration = Duration::from_millis(100);
    const LOCKOUT: Duration = Duration::from_millis(150);

    async fn check(store: &MemoryStore, key: &str, max: u32) -> CheckOutcome {
        store
            .check_and_increment(key, max, WINDOW, LOCKOUT)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_requests_within_ceiling_are_allowed() {
        let store = MemoryStore::new();

        for expected_remaining in [2, 1, 0] {
            let outcome = check(&store, "1.2.3.4", 3).await;
            assert!(outcome.allowed);
            assert_eq!(outcome.remaining, expected_remaining);
        }
    }

    #[tokio::test]
    async fn test_request_over_ceiling_is_denied_and_locks_out() {
        let store = MemoryStore::new();

        for _ in 0..3 {
            assert!(check(&store, "1.2.3.4", 3).await.allowed);
        }

        let denied = check(&store, "1.2.3.4", 3).await;
        assert!(!denied.allowed);
        assert!(store.is_locked_out("1.2.3.4").await.unwrap());
    }

    #[tokio::test]
    async fn test_lockout_outlasts_window_rollover() {
        let store = MemoryStore::new();

        for _ in 0..2 {
            check(&store, "1.2.3.4", 1).await;
        }
        assert!(store.is_locked_out("1.2.3.4").await.unwrap());

        // A new counting window would have started, but the lockout still
        // applies and the counter is not charged.
        sleep(WINDOW + Duration::from_millis(10)).await;
        let outcome = check(&store, "1.2.3.4", 1).await;
        assert!(!outcome.allowed);
        assert_eq!(outcome.remaining, 0);
    }

    #[tokio::test]
    async fn test_counter_restarts_after_lockout_expires() {
        let store = MemoryStore::new();

        for _ in 0..3 {
            check(&store, "1.2.3.4", 2).await;
        }

        sleep(LOCKOUT + Duration::from_millis(20)).await;

        // First request after lockout expiry counts as 1 in a fresh window.
        let outcome = check(&store, "1.2.3.4", 2).await;
        assert!(outcome.allowed);
        assert_eq!(outcome.remaining, 1);
    }

    #[tokio::test]
    async fn test_zero_ceiling_is_unlimited() {
        let store = MemoryStore::new();

        for _ in 0..100 {
            assert!(check(&store, "1.2.3.4", 0).await.allowed);
        }
        assert!(!store.is_locked_out("1.2.3.4").await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = MemoryStore::new();

        for _ in 0..3 {
            check(&store, "1.2.3.4", 2).await;
        }
        assert!(store.is_locked_out("1.2.3.4").await.unwrap());

        // Exhausting one key never affects another's quota.
        let other = check(&store, "token:abc", 2).await;
        assert!(other.allowed);
        assert_eq!(other.remaining, 1);
    }

    #[tokio::test]
    async fn test_reset_behaves_as_first_ever_request() {
        let store = MemoryStore::new();

        for _ in 0..3 {
            check(&store, "1.2.3.4", 2).await;
        }
        assert!(store.is_locked_out("1.2.3.4").await.unwrap());

        store.reset("1.2.3.4").await.unwrap();

        assert!(!store.is_locked_out("1.2.3.4").await.unwrap());
        let outcome = check(&store, "1.2.3.4", 2).await;
        assert!(outcome.allowed);
        assert_eq!(outcome.remaining, 1);
    }

    #[tokio::test]
    async fn test_explicit_set_lockout() {
        let store = MemoryStore::new();

        store
            .set_lockout("1.2.3.4", Duration::from_millis(50))
            .await
            .unwrap();
        assert!(store.is_locked_out("1.2.3.4").await.unwrap());

        sleep(Duration::from_millis(70)).await;
        assert!(!store.is_locked_out("1.2.3.4").await.unwrap());
    }

    #[tokio::test]
    async fn test_window_expiry_restarts_count() {
        let store = MemoryStore::new();

        for _ in 0..2 {
            assert!(check(&store, "1.2.3.4", 2).await.allowed);
        }

        sleep(WINDOW + Duration::from_millis(10)).await;

        let outcome = check(&store, "1.2.3.4", 2).await;
        assert!(outcome.allowed);
        assert_eq!(outcome.remaining, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_never_double_allow() {
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::new());
        let mut tasks = tokio::task::JoinSet::new();

        for _ in 0..20 {
            let store = store.clone();
            tasks.spawn(async move {
                store
                    .check_and_increment("1.2.3.4", 5, Duration::from_secs(5), LOCKOUT)
                    .await
                    .unwrap()
                    .allowed
            });
        }

        let mut allowed = 0;
        while let Some(result) = tasks.join_next().await {
            if result.unwrap() {
                allowed += 1;
            }
        }

        // Exactly the ceiling is admitted: no double-allow, no under-count.
        assert_eq!(allowed, 5);
    }
}

//! Redis-backed counting store.
//!
//! Counter and lockout records map to two key namespaces with native TTLs:
//!
//! - `requests:<key>` - window counter, `INCR` + `PEXPIRE` on first hit
//! - `lockout:<key>` - lockout flag, `SET ... PX <lockout>`
//!
//! `INCR` is atomic on the server, and the expiry is set only by the caller
//! that observed the post-increment value 1, so the window creation is
//! race-free without a transaction. Lockout writes are unconditional `SET`s:
//! concurrent ceiling crossings refresh the lockout rather than dropping a
//! write.
//!
//! The connection is a [`ConnectionManager`], which multiplexes and
//! reconnects internally; cloning it is cheap and every call gets safe
//! concurrent access without caller-side locking.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::store::{CheckOutcome, CounterStore, StoreError};

const REQUESTS_PREFIX: &str = "requests:";
const LOCKOUT_PREFIX: &str = "lockout:";

/// Counting store on a Redis (or Redis-compatible) server.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to the server at `url` (e.g. `redis://127.0.0.1:6379/0`).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the URL is invalid or the initial
    /// connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(store_err)?;
        let conn = ConnectionManager::new(client).await.map_err(store_err)?;
        Ok(Self { conn })
    }

    fn requests_key(key: &str) -> String {
        format!("{REQUESTS_PREFIX}{key}")
    }

    fn lockout_key(key: &str) -> String {
        format!("{LOCKOUT_PREFIX}{key}")
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn check_and_increment(
        &self,
        key: &str,
        max_requests: u32,
        window: Duration,
        lockout: Duration,
    ) -> Result<CheckOutcome, StoreError> {
        let mut conn = self.conn.clone();
        let requests_key = Self::requests_key(key);
        let lockout_key = Self::lockout_key(key);

        // Locked keys are denied without touching the counter.
        let locked: bool = conn.exists(&lockout_key).await.map_err(store_err)?;
        if locked {
            return Ok(CheckOutcome {
                allowed: false,
                remaining: 0,
            });
        }

        let count: i64 = conn.incr(&requests_key, 1i64).await.map_err(store_err)?;

        // This caller created the record; it alone sets the window expiry.
        if count == 1 {
            let _: bool = conn
                .pexpire(&requests_key, millis(window))
                .await
                .map_err(store_err)?;
        }

        let allowed = max_requests == 0 || count <= i64::from(max_requests);
        if !allowed {
            set_lockout_px(&mut conn, &lockout_key, lockout).await?;
        }

        Ok(CheckOutcome {
            allowed,
            remaining: i64::from(max_requests) - count,
        })
    }

    async fn is_locked_out(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        conn.exists(Self::lockout_key(key)).await.map_err(store_err)
    }

    async fn set_lockout(&self, key: &str, duration: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        set_lockout_px(&mut conn, &Self::lockout_key(key), duration).await
    }

    async fn reset(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .del(vec![Self::requests_key(key), Self::lockout_key(key)])
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

/// `SET <key> 1 PX <duration>` - last write wins on concurrent lockouts.
async fn set_lockout_px(
    conn: &mut ConnectionManager,
    lockout_key: &str,
    duration: Duration,
) -> Result<(), StoreError> {
    let _: () = redis::cmd("SET")
        .arg(lockout_key)
        .arg(1)
        .arg("PX")
        .arg(millis(duration))
        .query_async(conn)
        .await
        .map_err(store_err)?;
    Ok(())
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn store_err(e: redis::RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_key_namespaces() {
        assert_eq!(RedisStore::requests_key("1.2.3.4"), "requests:1.2.3.4");
        assert_eq!(
            RedisStore::lockout_key("token:abc"),
            "lockout:token:abc"
        );
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_secs(2)), 2000);
        assert_eq!(millis(Duration::MAX), i64::MAX);
    }
}

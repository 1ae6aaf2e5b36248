//! Fixed-window rate limiting: key classification, policy, counting stores,
//! and the decision engine.
//!
//! # Data Flow
//!
//! ```text
//! request ──▶ key::derive_key ──▶ RateLimiter::decide
//!                                      │
//!                  LimitPolicy ◀── classify(key)
//!                                      │
//!                                      ▼
//!                        CounterStore::check_and_increment
//!                        (memory or Redis, atomic per key)
//!                                      │
//!                                      ▼
//!                                  Decision
//! ```
//!
//! The enforcement middleware in [`crate::middleware`] translates decisions
//! into HTTP status codes and headers.

pub mod engine;
pub mod key;
pub mod memory;
pub mod policy;
pub mod redis;
pub mod store;

pub use engine::{Decision, RateLimiter};
pub use key::{TOKEN_KEY_PREFIX, UNKNOWN_IP, classify, derive_key};
pub use memory::MemoryStore;
pub use policy::{ClassPolicy, KeyClass, LimitPolicy};
pub use redis::RedisStore;
pub use store::{CheckOutcome, CounterStore, StoreError};

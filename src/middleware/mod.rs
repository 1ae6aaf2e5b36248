//! HTTP middleware: rate limit enforcement and request IDs.
//!
//! # Architecture
//!
//! ```text
//! Request → Rate Limiter → Request ID → Trace → Handler → Response
//!               ↓
//!     429 Too Many Requests (X-RateLimit-Reset)
//!     500 on store failure (fail-closed default)
//! ```

pub mod rate_limit;
pub mod request_id;

pub use rate_limit::RateLimitLayer;
pub use request_id::RequestIdLayer;

//! Rate limit enforcement middleware.
//!
//! The boundary component that calls the decision engine before dispatching
//! to the protected handler and translates decisions into protocol terms:
//!
//! - **Allowed**: forwards to the next handler unchanged and attaches
//!   `X-RateLimit-Remaining` and `X-RateLimit-Limit` to the response
//! - **Denied**: responds `429 Too Many Requests` with a JSON error body and
//!   an `X-RateLimit-Reset` header (RFC3339), without forwarding
//! - **Limiter error**: responds `500` (fail-closed) by default; the explicit
//!   fail-open variant forwards the request and logs a warning
//!
//! Fail-closed is the default so that a store outage never silently disables
//! protection; fail-open must be chosen deliberately via configuration.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::Json;
use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request, Response, StatusCode};
use axum::response::IntoResponse;
use serde_json::json;
use tower::{Layer, Service};
use tracing::{error, warn};

use crate::limiter::{Decision, RateLimiter, derive_key};

/// Remaining quota in the current window, set on allowed responses.
pub const RATE_LIMIT_REMAINING_HEADER: HeaderName =
    HeaderName::from_static("x-ratelimit-remaining");

/// Ceiling applied to the request's key class, set on allowed responses.
pub const RATE_LIMIT_LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");

/// RFC3339 timestamp after which the client may retry, set on denials.
pub const RATE_LIMIT_RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

const DENIED_MESSAGE: &str =
    "you have reached the maximum number of requests or actions allowed within a certain time frame";

/// Rate limit enforcement layer for the Tower middleware stack.
///
/// # Example
///
/// ```rust,ignore
/// let layer = RateLimitLayer::new(limiter, "token", false);
/// let app = Router::new()
///     .route("/generate", get(handler))
///     .route_layer(layer);
/// ```
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter>,
    /// Header carrying the opaque token credential
    token_header: Arc<str>,
    /// Forward on limiter error instead of failing closed
    fail_open: bool,
}

impl RateLimitLayer {
    /// Create an enforcement layer around a decision engine.
    pub fn new(limiter: Arc<RateLimiter>, token_header: &str, fail_open: bool) -> Self {
        Self {
            limiter,
            token_header: Arc::from(token_header),
            fail_open,
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
            token_header: self.token_header.clone(),
            fail_open: self.fail_open,
        }
    }
}

/// Rate limit enforcement service wrapper.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
    token_header: Arc<str>,
    fail_open: bool,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let limiter = self.limiter.clone();
        let fail_open = self.fail_open;
        let mut inner = self.inner.clone();

        // Derive the identity key before moving the request
        let key = derive_key(&req, &self.token_header);

        Box::pin(async move {
            match limiter.decide(&key).await {
                Ok(decision) if decision.allowed => {
                    let mut response = inner.call(req).await?;
                    attach_quota_headers(&mut response, &decision);
                    Ok(response)
                }
                Ok(decision) => {
                    warn!(
                        key = %key,
                        limit = decision.limit,
                        "Rate limit exceeded"
                    );
                    Ok(denied_response(&decision))
                }
                Err(e) if fail_open => {
                    // Explicit configuration choice: protection is disabled
                    // while the store is down
                    warn!(key = %key, error = %e, "Limiter unavailable, failing open");
                    inner.call(req).await
                }
                Err(e) => {
                    error!(key = %key, error = %e, "Limiter unavailable, failing closed");
                    Ok(unavailable_response())
                }
            }
        })
    }
}

fn attach_quota_headers(response: &mut Response<Body>, decision: &Decision) {
    let headers = response.headers_mut();
    headers.insert(
        RATE_LIMIT_REMAINING_HEADER,
        HeaderValue::from(decision.remaining),
    );
    headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(decision.limit));
}

fn denied_response(decision: &Decision) -> Response<Body> {
    let reset_at = decision.reset_at.unwrap_or_else(chrono::Utc::now);

    (
        StatusCode::TOO_MANY_REQUESTS,
        [(RATE_LIMIT_RESET_HEADER, reset_at.to_rfc3339())],
        Json(json!({ "error": DENIED_MESSAGE })),
    )
        .into_response()
}

fn unavailable_response() -> Response<Body> {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "rate limit check failed" })),
    )
        .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};

    #[test]
    fn test_denied_response_carries_reset_header() {
        let decision = Decision {
            allowed: false,
            remaining: 0,
            limit: 3,
            reset_at: Some(Utc::now() + TimeDelta::seconds(2)),
        };

        let response = denied_response(&decision);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let reset = response
            .headers()
            .get(RATE_LIMIT_RESET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        let parsed = chrono::DateTime::parse_from_rfc3339(reset).unwrap();
        assert!(parsed > Utc::now());
    }

    #[test]
    fn test_quota_headers_on_allowed_response() {
        let decision = Decision {
            allowed: true,
            remaining: 7,
            limit: 10,
            reset_at: None,
        };

        let mut response = Response::new(Body::empty());
        attach_quota_headers(&mut response, &decision);

        assert_eq!(
            response.headers().get(RATE_LIMIT_REMAINING_HEADER).unwrap(),
            "7"
        );
        assert_eq!(
            response.headers().get(RATE_LIMIT_LIMIT_HEADER).unwrap(),
            "10"
        );
    }

    #[test]
    fn test_unavailable_response_is_server_error() {
        let response = unavailable_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::limiter::StoreError;

/// Application-wide error types with appropriate HTTP status codes.
///
/// Rate limit denials are not errors; they are decisions translated by the
/// enforcement middleware. `LimiterUnavailable` is the distinguished failure
/// of the limiter itself (store connectivity, timeout), kept separate so it
/// can never be conflated with "allowed" or "denied".
#[derive(Error, Debug)]
pub enum AppError {
    #[error("rate limiter unavailable: {0}")]
    LimiterUnavailable(#[from] StoreError),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Error response body for API endpoints.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log full details server-side; clients get sanitized messages only
        tracing::error!(error = %self, "Request failed");

        let (status, error_type, message) = match &self {
            AppError::LimiterUnavailable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "rate_limiter_unavailable",
                "Rate limit check failed. Please try again later.",
            ),
            AppError::ConfigError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                "Service configuration error. Please contact support.",
            ),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: message.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_store_error_converts_to_limiter_unavailable() {
        let err: AppError = StoreError::Timeout(Duration::from_secs(1)).into();
        assert!(matches!(err, AppError::LimiterUnavailable(_)));
    }

    #[test]
    fn test_limiter_unavailable_maps_to_server_error() {
        let err = AppError::LimiterUnavailable(StoreError::Unavailable("down".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

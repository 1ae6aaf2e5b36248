//! The protected business handler: a UUID generator.
//!
//! Reached only when the enforcement middleware allowed the request; the
//! handler itself knows nothing about rate limiting.

use axum::Json;
use tracing::instrument;
use uuid::Uuid;

use crate::models::UuidResponse;

/// `GET /generate` - return a fresh version 4 UUID.
///
/// # Response Body
///
/// ```json
/// {
///   "uuid": "3b2f0f3e-1f6a-4b44-9c5e-7d1f4c2a9b10"
/// }
/// ```
#[instrument]
pub async fn generate_uuid() -> Json<UuidResponse> {
    Json(UuidResponse {
        uuid: Uuid::new_v4(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_each_call_yields_a_distinct_uuid() {
        let first = generate_uuid().await.0.uuid;
        let second = generate_uuid().await.0.uuid;
        assert_ne!(first, second);
    }
}

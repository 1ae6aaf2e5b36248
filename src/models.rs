//! API response body types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of a successful `GET /generate` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UuidResponse {
    /// The freshly generated version 4 UUID.
    pub uuid: Uuid,
}

/// Body of a `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded` (store unreachable).
    pub status: String,
    /// Whether the counting store answered a ping.
    pub store_connected: bool,
    /// Crate version.
    pub version: String,
    /// Seconds since the process started serving.
    pub uptime_seconds: u64,
    /// Server time of the check.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_response_serializes_to_expected_shape() {
        let response = UuidResponse {
            uuid: Uuid::new_v4(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("uuid").is_some());
        assert!(
            Uuid::parse_str(json["uuid"].as_str().unwrap()).is_ok(),
            "uuid field must round-trip as a UUID string"
        );
    }
}

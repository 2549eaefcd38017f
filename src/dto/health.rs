use serde::Serialize;
use utoipa::ToSchema;

/// Whether storage-backed operations are currently served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Storage reachable.
    Ok,
    /// Storage-backed operations answer 503.
    Degraded,
}

/// Body of `GET /healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Current availability.
    pub status: HealthStatus,
    /// Open leaderboard streams; absent when the hub did not answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribers: Option<usize>,
}

impl HealthResponse {
    /// Build the response for the given degraded flag.
    pub fn new(degraded: bool, subscribers: Option<usize>) -> Self {
        let status = if degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Ok
        };
        Self {
            status,
            subscribers,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn subscriber_count_is_omitted_when_unknown() {
        let body = serde_json::to_value(HealthResponse::new(true, None)).unwrap();
        assert_eq!(body, json!({ "status": "degraded" }));

        let body = serde_json::to_value(HealthResponse::new(false, Some(2))).unwrap();
        assert_eq!(body, json!({ "status": "ok", "subscribers": 2 }));
    }
}

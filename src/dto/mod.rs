use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Game status and admin acknowledgements.
pub mod game;
/// Health check payload.
pub mod health;
/// Scan request and response.
pub mod scan;
/// SSE event envelope.
pub mod sse;
/// Custom validators for request payloads.
pub mod validation;

/// RFC 3339 rendering used for every timestamp leaving the API.
fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}

use serde::Serialize;

/// SSE event name carrying a full leaderboard snapshot.
pub const LEADERBOARD_EVENT: &str = "leaderboard";

#[derive(Clone, Debug, PartialEq, Eq)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE `event:` field; `None` for the default message type.
    pub event: Option<String>,
    /// Serialized JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

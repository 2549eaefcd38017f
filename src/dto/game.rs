use serde::Serialize;
use utoipa::ToSchema;

use crate::{dao::models::GameSettingsEntity, dto::format_system_time};

/// Current lifecycle state of the hunt.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameStatusResponse {
    /// Steps required to complete the hunt.
    pub total_steps: u32,
    /// Whether the game has been started.
    pub started: bool,
    /// Whether the game has been ended.
    pub ended: bool,
    /// RFC 3339 start time, present once the game started.
    pub started_at: Option<String>,
}

impl From<GameSettingsEntity> for GameStatusResponse {
    fn from(settings: GameSettingsEntity) -> Self {
        Self {
            total_steps: settings.total_steps,
            started: settings.started,
            ended: settings.ended,
            started_at: settings.started_at.map(format_system_time),
        }
    }
}

/// Acknowledgement returned by administrative actions without a payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Human readable confirmation.
    pub message: String,
}

impl ActionResponse {
    /// Wrap a confirmation message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

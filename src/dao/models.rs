use std::{fmt, str::FromStr, time::SystemTime};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Opaque identity of a group.
pub type GroupId = Uuid;

/// Parallel track a group follows; steps are scoped per pathway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Pathway {
    Red,
    Blue,
    Yellow,
    Green,
}

impl Pathway {
    /// Every pathway, in declaration order.
    pub const ALL: [Pathway; 4] = [Pathway::Red, Pathway::Blue, Pathway::Yellow, Pathway::Green];

    /// Lowercase name used on the wire and in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Pathway::Red => "red",
            Pathway::Blue => "blue",
            Pathway::Yellow => "yellow",
            Pathway::Green => "green",
        }
    }
}

impl fmt::Display for Pathway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored or submitted pathway name is not one of [`Pathway::ALL`].
#[derive(Debug, Error)]
#[error("unknown pathway `{0}`")]
pub struct UnknownPathway(pub String);

impl FromStr for Pathway {
    type Err = UnknownPathway;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Pathway::ALL
            .into_iter()
            .find(|pathway| pathway.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownPathway(value.to_string()))
    }
}

/// Persisted state of a competing group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntity {
    /// Stable identifier for the group.
    pub id: GroupId,
    /// Unique display name.
    pub name: String,
    /// Pathway the group was assigned to.
    pub pathway: Pathway,
    /// Zero-based index of the step the group must scan next.
    pub current_step: u32,
    /// True once `current_step` reached the game's total step count.
    pub completed: bool,
    /// Moment the group completed its last step; set exactly once.
    pub completed_at: Option<SystemTime>,
    /// Secret the host application uses to authenticate the group.
    pub access_secret: String,
}

impl GroupEntity {
    /// Build a group sitting at the first step of `pathway`.
    pub fn new(name: impl Into<String>, pathway: Pathway, access_secret: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            pathway,
            current_step: 0,
            completed: false,
            completed_at: None,
            access_secret: access_secret.into(),
        }
    }
}

/// One checkpoint ("clue") of a pathway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEntity {
    /// Pathway the step belongs to.
    pub pathway: Pathway,
    /// Zero-based position inside the pathway; unique together with `pathway`.
    pub position: u32,
    /// Clue text shown to the group.
    pub content: String,
    /// Verification code printed at the checkpoint.
    pub code: String,
}

/// Singleton game settings row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSettingsEntity {
    /// Number of steps a group must clear to complete the hunt.
    pub total_steps: u32,
    /// Moment the game was started, present iff `started`.
    pub started_at: Option<SystemTime>,
    /// Set by the start action, cleared by reset.
    pub started: bool,
    /// Set by the end action, cleared by reset.
    pub ended: bool,
}

impl Default for GameSettingsEntity {
    fn default() -> Self {
        Self {
            total_steps: 1,
            started_at: None,
            started: false,
            ended: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pathway_parses_case_insensitively() {
        assert_eq!("red".parse::<Pathway>().unwrap(), Pathway::Red);
        assert_eq!(" Green ".parse::<Pathway>().unwrap(), Pathway::Green);
        assert!("purple".parse::<Pathway>().is_err());
    }

    #[test]
    fn pathway_serializes_lowercase() {
        let json = serde_json::to_string(&Pathway::Yellow).unwrap();
        assert_eq!(json, "\"yellow\"");
    }

    #[test]
    fn default_settings_match_fresh_install() {
        let settings = GameSettingsEntity::default();
        assert_eq!(settings.total_steps, 1);
        assert!(!settings.started && !settings.ended);
        assert!(settings.started_at.is_none());
    }
}

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{GroupEntity, GroupId, Pathway},
    dto::{format_system_time, validation::validate_scan_code},
    services::progress_service::ScanOutcome,
};

/// Code read by a group at a checkpoint.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ScanRequest {
    /// Code as scanned, 1 to 256 characters.
    #[validate(length(min = 1, max = 256), custom(function = validate_scan_code))]
    pub code: String,
}

/// Which defined result a scan produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcomeKind {
    /// The group moved to its next step.
    Advanced,
    /// Wrong code for the current step.
    InvalidCode,
    /// The group had already finished.
    AlreadyCompleted,
}

/// Public view of a group's progress. The access secret never leaves the server.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GroupProgress {
    /// Group identifier.
    #[schema(value_type = String, format = Uuid)]
    pub id: GroupId,
    /// Display name.
    pub name: String,
    /// Track the group follows.
    pub pathway: Pathway,
    /// Steps cleared so far.
    pub current_step: u32,
    /// Whether every step is cleared.
    pub completed: bool,
    /// RFC 3339 completion time.
    pub completed_at: Option<String>,
}

impl From<GroupEntity> for GroupProgress {
    fn from(group: GroupEntity) -> Self {
        Self {
            id: group.id,
            name: group.name,
            pathway: group.pathway,
            current_step: group.current_step,
            completed: group.completed,
            completed_at: group.completed_at.map(format_system_time),
        }
    }
}

/// Response of `POST /groups/{id}/scan`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScanResponse {
    /// Result of the scan.
    pub outcome: ScanOutcomeKind,
    /// Progress after the scan.
    pub group: GroupProgress,
}

impl From<ScanOutcome> for ScanResponse {
    fn from(outcome: ScanOutcome) -> Self {
        let (kind, group) = match outcome {
            ScanOutcome::Advanced(group) => (ScanOutcomeKind::Advanced, group),
            ScanOutcome::InvalidCode(group) => (ScanOutcomeKind::InvalidCode, group),
            ScanOutcome::AlreadyCompleted(group) => (ScanOutcomeKind::AlreadyCompleted, group),
        };
        Self {
            outcome: kind,
            group: group.into(),
        }
    }
}

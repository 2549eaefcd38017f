use mongodb::bson::{self, DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::{GameSettingsEntity, GroupEntity, Pathway, StepEntity};

pub const GROUP_COLLECTION_NAME: &str = "groups";
pub const STEP_COLLECTION_NAME: &str = "steps";
pub const SETTINGS_COLLECTION_NAME: &str = "game_settings";
/// Primary key of the singleton settings document.
pub const SETTINGS_ID: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGroupDocument {
    #[serde(rename = "_id")]
    pub id: bson::Uuid,
    pub name: String,
    pub pathway: String,
    pub current_step: i64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime>,
    pub access_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoStepDocument {
    pub pathway: String,
    pub position: i64,
    pub content: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSettingsDocument {
    #[serde(rename = "_id")]
    pub id: i32,
    pub total_steps: i64,
    #[serde(default)]
    pub started_at: Option<DateTime>,
    #[serde(default)]
    pub started: bool,
    #[serde(default)]
    pub ended: bool,
}

impl From<GroupEntity> for MongoGroupDocument {
    fn from(value: GroupEntity) -> Self {
        Self {
            id: uuid_as_bson(value.id),
            name: value.name,
            pathway: value.pathway.as_str().to_owned(),
            current_step: i64::from(value.current_step),
            completed: value.completed,
            completed_at: value.completed_at.map(DateTime::from_system_time),
            access_secret: value.access_secret,
        }
    }
}

impl TryFrom<MongoGroupDocument> for GroupEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoGroupDocument) -> MongoResult<Self> {
        Ok(Self {
            id: Uuid::from_bytes(value.id.bytes()),
            name: value.name,
            pathway: parse_pathway(GROUP_COLLECTION_NAME, &value.pathway)?,
            current_step: to_u32(GROUP_COLLECTION_NAME, "current_step", value.current_step)?,
            completed: value.completed,
            completed_at: value.completed_at.map(DateTime::to_system_time),
            access_secret: value.access_secret,
        })
    }
}

impl TryFrom<MongoStepDocument> for StepEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoStepDocument) -> MongoResult<Self> {
        Ok(Self {
            pathway: parse_pathway(STEP_COLLECTION_NAME, &value.pathway)?,
            position: to_u32(STEP_COLLECTION_NAME, "position", value.position)?,
            content: value.content,
            code: value.code,
        })
    }
}

impl TryFrom<MongoSettingsDocument> for GameSettingsEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoSettingsDocument) -> MongoResult<Self> {
        Ok(Self {
            total_steps: to_u32(SETTINGS_COLLECTION_NAME, "total_steps", value.total_steps)?,
            started_at: value.started_at.map(DateTime::to_system_time),
            started: value.started,
            ended: value.ended,
        })
    }
}

pub fn uuid_as_bson(id: Uuid) -> bson::Uuid {
    bson::Uuid::from_bytes(id.into_bytes())
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_bson(id)}
}

fn parse_pathway(collection: &'static str, raw: &str) -> MongoResult<Pathway> {
    raw.parse().map_err(|err: crate::dao::models::UnknownPathway| {
        MongoDaoError::Malformed {
            collection,
            reason: err.to_string(),
        }
    })
}

fn to_u32(collection: &'static str, field: &str, raw: i64) -> MongoResult<u32> {
    u32::try_from(raw).map_err(|_| MongoDaoError::Malformed {
        collection,
        reason: format!("`{field}` out of range: {raw}"),
    })
}

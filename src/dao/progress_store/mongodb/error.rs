//! Error types raised by the MongoDB progress store.

use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::Pathway;

/// Convenient result alias returning [`MongoDaoError`] failures.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures that can occur while interacting with MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to load group `{id}`")]
    LoadGroup {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load step {position} of pathway `{pathway}`")]
    LoadStep {
        pathway: Pathway,
        position: u32,
        #[source]
        source: MongoError,
    },
    #[error("failed to list groups")]
    ListGroups {
        #[source]
        source: MongoError,
    },
    #[error("failed to advance group `{id}`")]
    AdvanceGroup {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to {action} game settings")]
    Settings {
        action: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("progress reset transaction failed during {stage}")]
    Reset {
        stage: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("malformed {collection} document: {reason}")]
    Malformed {
        collection: &'static str,
        reason: String,
    },
}

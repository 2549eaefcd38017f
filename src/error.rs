use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::{
        models::{GroupId, Pathway},
        storage::StorageError,
    },
    state::hub::HubClosed,
};

/// Failures of service operations, independent of the transport.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A store call failed; nothing was written.
    #[error("storage unavailable")]
    Unavailable(#[from] StorageError),
    /// No store is installed or the supervisor flagged it unreachable.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Lifecycle transition not allowed from the current game state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// No group carries the given id.
    #[error("group `{0}` not found")]
    GroupNotFound(GroupId),
    /// The group points at a step that is not configured.
    #[error("step {position} of pathway `{pathway}` is not configured")]
    StepNotFound {
        /// Pathway of the group.
        pathway: Pathway,
        /// Step index the group sits at.
        position: u32,
    },
    /// The conditional write kept losing against other writers.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Operation exceeded its time limit.
    #[error("operation timed out")]
    Timeout,
    /// The leaderboard hub stopped.
    #[error("leaderboard stream closed")]
    StreamClosed(#[from] HubClosed),
}

/// Errors rendered as HTTP responses with a JSON `{ "message": ... }` body.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Request conflicts with the stored state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Storage is unreachable or the server is shutting down.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// HTTP status the error renders with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {err}"))
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded | ServiceError::Timeout | ServiceError::StreamClosed(_) => {
                AppError::ServiceUnavailable(message)
            }
            ServiceError::GroupNotFound(_) => AppError::NotFound(message),
            ServiceError::InvalidState(detail) | ServiceError::Conflict(detail) => {
                AppError::Conflict(detail)
            }
            ServiceError::StepNotFound { .. } => AppError::Conflict(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

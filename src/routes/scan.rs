use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_valid::Valid;

use crate::{
    dao::models::GroupId,
    dto::scan::{ScanRequest, ScanResponse},
    error::AppError,
    services::progress_service,
    state::SharedState,
};

#[utoipa::path(
    post,
    path = "/groups/{id}/scan",
    tag = "groups",
    params(("id" = Uuid, Path, description = "Group identifier")),
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Scan processed", body = ScanResponse),
        (status = 400, description = "Malformed code"),
        (status = 404, description = "Unknown group"),
        (status = 409, description = "Current step is not configured"),
        (status = 503, description = "Storage unavailable")
    )
)]
/// Check a scanned code against the group's current step and advance it on a match.
pub async fn scan_code(
    State(state): State<SharedState>,
    Path(id): Path<GroupId>,
    Valid(Json(payload)): Valid<Json<ScanRequest>>,
) -> Result<Json<ScanResponse>, AppError> {
    let outcome = progress_service::advance_progress(&state, id, &payload.code).await?;
    Ok(Json(outcome.into()))
}

/// Configure the scan routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/groups/{id}/scan", post(scan_code))
}

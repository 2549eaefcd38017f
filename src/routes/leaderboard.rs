use axum::{Json, Router, extract::State, routing::get};

use crate::{
    error::AppError,
    services::leaderboard_service,
    state::{SharedState, leaderboard::LeaderboardSnapshot},
};

#[utoipa::path(
    get,
    path = "/leaderboard",
    tag = "leaderboard",
    responses(
        (status = 200, description = "Freshly composed leaderboard", body = LeaderboardSnapshot),
        (status = 503, description = "Storage unavailable")
    )
)]
/// Compose the leaderboard from storage.
pub async fn leaderboard(
    State(state): State<SharedState>,
) -> Result<Json<LeaderboardSnapshot>, AppError> {
    Ok(Json(leaderboard_service::current_leaderboard(&state).await?))
}

/// Configure the leaderboard JSON route.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/leaderboard", get(leaderboard))
}

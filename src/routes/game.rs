use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::game::{ActionResponse, GameStatusResponse},
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Game status and lifecycle endpoints. Authentication is left to the fronting host.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/game/status", get(game_status))
        .route("/admin/game/start", post(start_game))
        .route("/admin/game/end", post(end_game))
        .route("/admin/game/reset", post(reset_game))
}

#[utoipa::path(
    get,
    path = "/game/status",
    tag = "leaderboard",
    responses((status = 200, description = "Current game state", body = GameStatusResponse))
)]
/// Report whether the game is running and how many steps it has.
pub async fn game_status(
    State(state): State<SharedState>,
) -> Result<Json<GameStatusResponse>, AppError> {
    Ok(Json(game_service::game_status(&state).await?.into()))
}

#[utoipa::path(
    post,
    path = "/admin/game/start",
    tag = "admin",
    responses(
        (status = 200, description = "Game started", body = GameStatusResponse),
        (status = 409, description = "Game already started")
    )
)]
/// Start the game and stamp its start time.
pub async fn start_game(
    State(state): State<SharedState>,
) -> Result<Json<GameStatusResponse>, AppError> {
    Ok(Json(game_service::start_game(&state).await?.into()))
}

#[utoipa::path(
    post,
    path = "/admin/game/end",
    tag = "admin",
    responses(
        (status = 200, description = "Game ended", body = GameStatusResponse),
        (status = 409, description = "Game not running")
    )
)]
/// End a running game.
pub async fn end_game(
    State(state): State<SharedState>,
) -> Result<Json<GameStatusResponse>, AppError> {
    Ok(Json(game_service::end_game(&state).await?.into()))
}

#[utoipa::path(
    post,
    path = "/admin/game/reset",
    tag = "admin",
    responses((status = 200, description = "Progress reset", body = ActionResponse))
)]
/// Send the game and every group back to the start.
pub async fn reset_game(State(state): State<SharedState>) -> Result<Json<ActionResponse>, AppError> {
    game_service::reset_progress(&state).await?;
    Ok(Json(ActionResponse::new("game progress reset")))
}

use axum::Router;

use crate::state::SharedState;

/// Swagger UI and OpenAPI JSON.
pub mod docs;
/// Game lifecycle routes.
pub mod game;
/// Health check route.
pub mod health;
/// Leaderboard JSON route.
pub mod leaderboard;
/// Checkpoint scan route.
pub mod scan;
/// Leaderboard SSE stream.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(scan::router())
        .merge(leaderboard::router())
        .merge(sse::router())
        .merge(game::router());

    api_router.merge(docs::router()).with_state(state)
}

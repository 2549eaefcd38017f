use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{error::AppError, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/leaderboard",
    tag = "leaderboard",
    responses(
        (status = 200, description = "Leaderboard SSE stream, one `leaderboard` event per snapshot", content_type = "text/event-stream", body = String),
        (status = 503, description = "Server shutting down")
    )
)]
/// Stream leaderboard snapshots, starting with the latest one.
pub async fn leaderboard_stream(
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let subscription = sse_service::subscribe_leaderboard(&state).await?;
    info!(subscriber = subscription.id(), "New leaderboard SSE connection");
    Ok(sse_service::to_sse_stream(
        subscription,
        state.config().keep_alive,
    ))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/leaderboard", get(leaderboard_stream))
}

use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping the store when one is installed and report degraded mode with the
/// number of open leaderboard streams.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    if let Some(store) = state.progress_store().await {
        if let Err(err) = store.health_check().await {
            warn!(error = %err, "progress store ping failed");
        }
    }

    let subscribers = match state.leaderboard_hub().stats().await {
        Ok(stats) => Some(stats.subscribers),
        Err(err) => {
            warn!(error = %err, "leaderboard hub did not report stats");
            None
        }
    };

    HealthResponse::new(state.is_degraded(), subscribers)
}

use std::sync::Arc;

use tokio::{task::JoinHandle, time::timeout};
use tracing::{debug, warn};

use crate::{
    dto::sse::{LEADERBOARD_EVENT, ServerEvent},
    error::ServiceError,
    state::{
        SharedState,
        leaderboard::{LeaderboardSnapshot, compose},
    },
};

/// Read settings and groups and rank them.
pub async fn current_leaderboard(state: &SharedState) -> Result<LeaderboardSnapshot, ServiceError> {
    let store = state.require_store().await?;
    let settings = store.game_settings().await?;
    let groups = store.list_groups_for_leaderboard().await?;
    Ok(compose(settings.total_steps, settings.started_at, groups))
}

/// Serialize `snapshot` once and hand it to the leaderboard hub.
pub fn publish_snapshot(state: &SharedState, snapshot: &LeaderboardSnapshot) {
    match ServerEvent::json(Some(LEADERBOARD_EVENT.to_string()), snapshot) {
        Ok(event) => state.leaderboard_hub().publish(Arc::new(event)),
        Err(err) => warn!(error = %err, "failed to serialize leaderboard snapshot"),
    }
}

/// Recompose and publish once, bounded by the configured refresh timeout.
pub async fn refresh_leaderboard(state: &SharedState) -> Result<(), ServiceError> {
    let limit = state.config().refresh_timeout;
    let snapshot = timeout(limit, current_leaderboard(state))
        .await
        .map_err(|_| ServiceError::Timeout)??;
    publish_snapshot(state, &snapshot);
    Ok(())
}

/// Refresh once to prime the cache, then once per (coalesced) refresh request
/// until shutdown. Failures only cost subscribers one update.
pub async fn run_refresher(state: SharedState) {
    let shutdown = state.shutdown_token().clone();

    loop {
        match refresh_leaderboard(&state).await {
            Ok(()) => debug!("leaderboard published"),
            Err(ServiceError::Degraded) => debug!("leaderboard refresh skipped in degraded mode"),
            Err(err) => warn!(error = %err, "leaderboard refresh failed"),
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = state.refresh_requested() => {}
        }
    }

    debug!("leaderboard refresher stopped");
}

/// Spawn [`run_refresher`] as a detached task.
pub fn spawn_refresher(state: &SharedState) -> JoinHandle<()> {
    tokio::spawn(run_refresher(state.clone()))
}

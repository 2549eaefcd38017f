use std::time::SystemTime;

use tracing::info;

use crate::{
    dao::{models::GameSettingsEntity, progress_store::LifecycleWrite},
    error::ServiceError,
    state::SharedState,
};

/// Current lifecycle state and step count.
pub async fn game_status(state: &SharedState) -> Result<GameSettingsEntity, ServiceError> {
    let store = state.require_store().await?;
    Ok(store.game_settings().await?)
}

/// Mark the game started and record the start time used for elapsed times.
pub async fn start_game(state: &SharedState) -> Result<GameSettingsEntity, ServiceError> {
    let store = state.require_store().await?;
    let settings = applied(store.start_game(SystemTime::now()).await?)?;
    info!("game started");
    state.request_leaderboard_refresh();
    Ok(settings)
}

/// Mark a running game ended.
pub async fn end_game(state: &SharedState) -> Result<GameSettingsEntity, ServiceError> {
    let store = state.require_store().await?;
    let settings = applied(store.end_game().await?)?;
    info!("game ended");
    state.request_leaderboard_refresh();
    Ok(settings)
}

/// Put the game and every group back to the starting line in one transaction.
pub async fn reset_progress(state: &SharedState) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    store.reset_progress().await?;
    info!("game progress reset");
    state.request_leaderboard_refresh();
    Ok(())
}

fn applied(write: LifecycleWrite) -> Result<GameSettingsEntity, ServiceError> {
    match write {
        LifecycleWrite::Applied(settings) => Ok(settings),
        LifecycleWrite::AlreadyStarted => {
            Err(ServiceError::InvalidState("game already started".into()))
        }
        LifecycleWrite::NotStarted => Err(ServiceError::InvalidState("game has not started".into())),
        LifecycleWrite::AlreadyEnded => Err(ServiceError::InvalidState("game already ended".into())),
    }
}

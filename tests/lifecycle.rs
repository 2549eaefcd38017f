mod common;

use std::{sync::Arc, time::Duration};

use hunt_board::{
    dao::{
        models::Pathway,
        progress_store::{InMemoryProgressStore, ProgressStore},
        storage::StorageError,
    },
    error::ServiceError,
    services::{
        game_service, leaderboard_service,
        progress_service::{ScanOutcome, advance_progress},
        storage_supervisor,
    },
    state::AppState,
};
use tokio::time::timeout;

use common::{add_group, code_for, fast_config, state_for, store_with_steps};

#[tokio::test]
async fn game_can_only_start_and_end_once() {
    let store = store_with_steps(2).await;
    let state = state_for(&store).await;

    let err = game_service::end_game(&state).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));

    let started = game_service::start_game(&state).await.unwrap();
    assert!(started.started);
    assert!(started.started_at.is_some());
    assert!(matches!(
        game_service::start_game(&state).await,
        Err(ServiceError::InvalidState(_))
    ));

    let ended = game_service::end_game(&state).await.unwrap();
    assert!(ended.ended);
    assert!(matches!(
        game_service::end_game(&state).await,
        Err(ServiceError::InvalidState(_))
    ));

    let status = game_service::game_status(&state).await.unwrap();
    assert_eq!(status.total_steps, 2);
    assert!(status.started && status.ended);
}

#[tokio::test]
async fn finishers_get_elapsed_time_once_the_game_started() {
    let store = store_with_steps(1).await;
    let id = add_group(&store, "Ravens", Pathway::Yellow, 0);
    let state = state_for(&store).await;

    game_service::start_game(&state).await.unwrap();
    let outcome = advance_progress(&state, id, &code_for(Pathway::Yellow, 0))
        .await
        .unwrap();
    assert!(matches!(outcome, ScanOutcome::Advanced(ref g) if g.completed));

    let snapshot = leaderboard_service::current_leaderboard(&state).await.unwrap();
    assert_eq!(snapshot.completed_groups, 1);
    let elapsed = snapshot.groups[0].elapsed.as_deref().unwrap();
    assert!(elapsed.starts_with("0:0"), "unexpected elapsed {elapsed}");
}

#[tokio::test]
async fn reset_returns_everyone_to_the_start() {
    let store = store_with_steps(2).await;
    let done = add_group(&store, "Finches", Pathway::Red, 1);
    let midway = add_group(&store, "Swifts", Pathway::Blue, 1);
    let state = state_for(&store).await;

    game_service::start_game(&state).await.unwrap();
    advance_progress(&state, done, &code_for(Pathway::Red, 1))
        .await
        .unwrap();

    game_service::reset_progress(&state).await.unwrap();

    for id in [done, midway] {
        let group = store.find_group(id).await.unwrap().unwrap();
        assert_eq!(group.current_step, 0);
        assert!(!group.completed);
        assert!(group.completed_at.is_none());
    }
    let status = game_service::game_status(&state).await.unwrap();
    assert!(!status.started && !status.ended);
    assert!(status.started_at.is_none());

    // A fresh game can be started after the reset.
    game_service::start_game(&state).await.unwrap();
}

#[tokio::test]
async fn supervisor_installs_store_and_stops_on_shutdown() {
    let store = store_with_steps(1).await;
    let state = AppState::new(fast_config());
    assert!(state.is_degraded());
    assert!(matches!(
        game_service::game_status(&state).await,
        Err(ServiceError::Degraded)
    ));

    let supervisor = tokio::spawn(storage_supervisor::run(state.clone(), {
        let store = store.clone();
        move || {
            let store = store.clone();
            async move { Ok::<Arc<dyn ProgressStore>, StorageError>(Arc::new(store)) }
        }
    }));

    let mut degraded = state.degraded_watcher();
    timeout(Duration::from_secs(1), degraded.wait_for(|flag| !*flag))
        .await
        .unwrap()
        .unwrap();
    assert!(game_service::game_status(&state).await.is_ok());

    state.shutdown_token().cancel();
    timeout(Duration::from_secs(1), supervisor)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn empty_store_reports_default_settings() {
    let store = InMemoryProgressStore::new();
    let state = state_for(&store).await;
    let status = game_service::game_status(&state).await.unwrap();
    assert_eq!(status.total_steps, 1);
    assert!(!status.started);
}

use tracing::{debug, info};

use crate::{
    dao::{
        models::{GroupEntity, GroupId},
        progress_store::AdvanceWrite,
    },
    error::ServiceError,
    services::scan_validator::codes_match,
    state::SharedState,
};

/// Re-validations allowed after losing the conditional write to another process.
const MAX_STALE_RETRIES: usize = 3;

/// Defined, non-error results of a scan. Only `Advanced` mutates state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The code matched; carries the row as written.
    Advanced(GroupEntity),
    /// The code did not match the current step; nothing was written.
    InvalidCode(GroupEntity),
    /// The group already finished its pathway.
    AlreadyCompleted(GroupEntity),
}

impl ScanOutcome {
    /// Group row backing the outcome.
    pub fn group(&self) -> &GroupEntity {
        match self {
            ScanOutcome::Advanced(group)
            | ScanOutcome::InvalidCode(group)
            | ScanOutcome::AlreadyCompleted(group) => group,
        }
    }
}

/// Validate `code` against the group's current step and advance it by one on a match.
///
/// Scans of the same group are serialised on the in-process group lock; the
/// store's conditional write covers other processes sharing the same store.
/// A lost write is re-validated against the fresh row.
pub async fn advance_progress(
    state: &SharedState,
    group_id: GroupId,
    code: &str,
) -> Result<ScanOutcome, ServiceError> {
    let store = state.require_store().await?;
    let _guard = state.group_locks().acquire(group_id).await;

    for attempt in 0..=MAX_STALE_RETRIES {
        let group = store
            .find_group(group_id)
            .await?
            .ok_or(ServiceError::GroupNotFound(group_id))?;

        if group.completed {
            debug!(group_id = %group_id, "scan after completion ignored");
            return Ok(ScanOutcome::AlreadyCompleted(group));
        }

        let settings = store.game_settings().await?;
        let step = store
            .find_step(group.pathway, group.current_step)
            .await?
            .ok_or(ServiceError::StepNotFound {
                pathway: group.pathway,
                position: group.current_step,
            })?;

        if !codes_match(code, &step.code) {
            debug!(group_id = %group_id, step = group.current_step, "invalid scan code");
            return Ok(ScanOutcome::InvalidCode(group));
        }

        match store
            .persist_advance(group_id, group.current_step, settings.total_steps)
            .await?
        {
            AdvanceWrite::Persisted(updated) => {
                info!(
                    group_id = %group_id,
                    step = updated.current_step,
                    completed = updated.completed,
                    "group advanced"
                );
                state.request_leaderboard_refresh();
                return Ok(ScanOutcome::Advanced(updated));
            }
            AdvanceWrite::Stale => {
                debug!(
                    group_id = %group_id,
                    attempt,
                    "group changed concurrently; re-validating"
                );
            }
        }
    }

    Err(ServiceError::Conflict(format!(
        "group `{group_id}` kept changing during the scan"
    )))
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::SystemTime};

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{GameSettingsEntity, Pathway, StepEntity},
            progress_store::{InMemoryProgressStore, LifecycleWrite, ProgressStore},
            storage::{StorageError, StorageResult},
        },
        state::AppState,
    };

    const CODES: [&str; 3] = ["ALPHA", "BRAVO", "CHARLIE"];

    async fn seeded(current_step: u32) -> (SharedState, InMemoryProgressStore, GroupId) {
        let store = InMemoryProgressStore::new();
        store.set_total_steps(CODES.len() as u32).await;
        for (position, code) in CODES.iter().enumerate() {
            store.insert_step(StepEntity {
                pathway: Pathway::Blue,
                position: position as u32,
                content: format!("clue {position}"),
                code: code.to_string(),
            });
        }
        let mut group = GroupEntity::new("Badgers", Pathway::Blue, "pw");
        group.current_step = current_step;
        let id = group.id;
        store.insert_group(group);

        let state = AppState::new(AppConfig::default());
        state.install_store(Arc::new(store.clone())).await;
        (state, store, id)
    }

    #[tokio::test]
    async fn matching_code_advances_one_step() {
        let (state, store, id) = seeded(0).await;
        let outcome = advance_progress(&state, id, "ALPHA").await.unwrap();
        let ScanOutcome::Advanced(group) = outcome else {
            panic!("expected an advance, got {outcome:?}");
        };
        assert_eq!(group.current_step, 1);
        assert!(!group.completed);
        assert_eq!(store.find_group(id).await.unwrap().unwrap().current_step, 1);
    }

    #[tokio::test]
    async fn code_of_another_step_is_invalid_and_leaves_group_untouched() {
        let (state, store, id) = seeded(1).await;
        let outcome = advance_progress(&state, id, "ALPHA").await.unwrap();
        assert!(matches!(outcome, ScanOutcome::InvalidCode(ref g) if g.current_step == 1));
        assert_eq!(store.find_group(id).await.unwrap().unwrap().current_step, 1);
    }

    #[tokio::test]
    async fn last_step_completes_and_further_scans_are_idempotent() {
        let (state, store, id) = seeded(2).await;
        let ScanOutcome::Advanced(done) = advance_progress(&state, id, "CHARLIE").await.unwrap()
        else {
            panic!("expected completion");
        };
        assert_eq!(done.current_step, 3);
        assert!(done.completed);
        let stamped = done.completed_at;
        assert!(stamped.is_some());

        for code in ["CHARLIE", "nonsense"] {
            let outcome = advance_progress(&state, id, code).await.unwrap();
            assert!(matches!(outcome, ScanOutcome::AlreadyCompleted(_)));
        }
        let stored = store.find_group(id).await.unwrap().unwrap();
        assert_eq!(stored.current_step, 3);
        assert_eq!(stored.completed_at, stamped);
    }

    #[tokio::test]
    async fn unknown_group_is_not_found() {
        let (state, _store, _id) = seeded(0).await;
        let err = advance_progress(&state, GroupId::new_v4(), "ALPHA")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::GroupNotFound(_)));
    }

    #[tokio::test]
    async fn scans_of_unknown_groups_leave_no_locks_behind() {
        let (state, _store, id) = seeded(0).await;
        for _ in 0..1_000 {
            let err = advance_progress(&state, GroupId::new_v4(), "x")
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::GroupNotFound(_)));
        }
        advance_progress(&state, id, "ALPHA").await.unwrap();
        assert!(state.group_locks().is_empty());
    }

    #[tokio::test]
    async fn missing_step_configuration_is_reported() {
        let (state, store, _id) = seeded(0).await;
        let stray = GroupEntity::new("Stray", Pathway::Green, "pw");
        let stray_id = stray.id;
        store.insert_group(stray);

        let err = advance_progress(&state, stray_id, "ALPHA").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::StepNotFound {
                pathway: Pathway::Green,
                position: 0
            }
        ));
    }

    #[tokio::test]
    async fn degraded_mode_rejects_scans() {
        let (state, _store, id) = seeded(0).await;
        state.clear_store().await;
        let err = advance_progress(&state, id, "ALPHA").await.unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
    }

    /// Delegates reads to a memory store but never wins the conditional write.
    #[derive(Clone)]
    struct LosingStore(InMemoryProgressStore);

    impl ProgressStore for LosingStore {
        fn find_group(&self, id: GroupId) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>> {
            self.0.find_group(id)
        }
        fn find_step(
            &self,
            pathway: Pathway,
            position: u32,
        ) -> BoxFuture<'static, StorageResult<Option<StepEntity>>> {
            self.0.find_step(pathway, position)
        }
        fn game_settings(&self) -> BoxFuture<'static, StorageResult<GameSettingsEntity>> {
            self.0.game_settings()
        }
        fn persist_advance(
            &self,
            _id: GroupId,
            _expected_step: u32,
            _total_steps: u32,
        ) -> BoxFuture<'static, StorageResult<AdvanceWrite>> {
            Box::pin(async { Ok(AdvanceWrite::Stale) })
        }
        fn list_groups_for_leaderboard(
            &self,
        ) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>> {
            self.0.list_groups_for_leaderboard()
        }
        fn start_game(&self, at: SystemTime) -> BoxFuture<'static, StorageResult<LifecycleWrite>> {
            self.0.start_game(at)
        }
        fn end_game(&self) -> BoxFuture<'static, StorageResult<LifecycleWrite>> {
            self.0.end_game()
        }
        fn reset_progress(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.0.reset_progress()
        }
        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.0.health_check()
        }
        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.0.try_reconnect()
        }
    }

    #[tokio::test]
    async fn endless_contention_ends_in_conflict() {
        let (state, store, id) = seeded(0).await;
        state.install_store(Arc::new(LosingStore(store.clone()))).await;

        let err = advance_progress(&state, id, "ALPHA").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(store.find_group(id).await.unwrap().unwrap().current_step, 0);
    }

    /// Fails every read of the group row.
    struct BrokenStore(InMemoryProgressStore);

    #[derive(Debug, thiserror::Error)]
    #[error("connection reset")]
    struct ConnectionReset;

    impl ProgressStore for BrokenStore {
        fn find_group(&self, _id: GroupId) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>> {
            Box::pin(async {
                Err(StorageError::unavailable(
                    "lost connection".into(),
                    ConnectionReset,
                ))
            })
        }
        fn find_step(
            &self,
            pathway: Pathway,
            position: u32,
        ) -> BoxFuture<'static, StorageResult<Option<StepEntity>>> {
            self.0.find_step(pathway, position)
        }
        fn game_settings(&self) -> BoxFuture<'static, StorageResult<GameSettingsEntity>> {
            self.0.game_settings()
        }
        fn persist_advance(
            &self,
            id: GroupId,
            expected_step: u32,
            total_steps: u32,
        ) -> BoxFuture<'static, StorageResult<AdvanceWrite>> {
            self.0.persist_advance(id, expected_step, total_steps)
        }
        fn list_groups_for_leaderboard(
            &self,
        ) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>> {
            self.0.list_groups_for_leaderboard()
        }
        fn start_game(&self, at: SystemTime) -> BoxFuture<'static, StorageResult<LifecycleWrite>> {
            self.0.start_game(at)
        }
        fn end_game(&self) -> BoxFuture<'static, StorageResult<LifecycleWrite>> {
            self.0.end_game()
        }
        fn reset_progress(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.0.reset_progress()
        }
        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.0.health_check()
        }
        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.0.try_reconnect()
        }
    }

    #[tokio::test]
    async fn storage_failures_propagate_without_mutation() {
        let (state, store, id) = seeded(0).await;
        state.install_store(Arc::new(BrokenStore(store.clone()))).await;

        let err = advance_progress(&state, id, "ALPHA").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert_eq!(store.find_group(id).await.unwrap().unwrap().current_step, 0);
    }
}

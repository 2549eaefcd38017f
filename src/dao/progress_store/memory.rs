//! Process-local progress store used by tests and ephemeral deployments.

use std::{sync::Arc, time::SystemTime};

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::RwLock;

use super::{AdvanceWrite, LifecycleWrite, ProgressStore, advanced};
use crate::dao::{
    models::{GameSettingsEntity, GroupEntity, GroupId, Pathway, StepEntity},
    storage::StorageResult,
};

/// In-memory [`ProgressStore`].
///
/// Each group row is guarded by its map entry lock, which plays the role of a
/// row lock. Whole-table operations (the reset and leaderboard reads) take the
/// `tables` lock exclusively or shared so they never observe a half-applied reset.
#[derive(Clone, Default)]
pub struct InMemoryProgressStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    tables: RwLock<()>,
    groups: DashMap<GroupId, GroupEntity>,
    steps: DashMap<(Pathway, u32), StepEntity>,
    settings: RwLock<Option<GameSettingsEntity>>,
}

impl InMemoryProgressStore {
    /// Empty store reporting default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a group row.
    pub fn insert_group(&self, group: GroupEntity) {
        self.inner.groups.insert(group.id, group);
    }

    /// Insert or replace the step at `(pathway, position)`.
    pub fn insert_step(&self, step: StepEntity) {
        self.inner.steps.insert((step.pathway, step.position), step);
    }

    /// Store the total step count, creating the settings row when missing.
    pub async fn set_total_steps(&self, total_steps: u32) {
        let mut settings = self.inner.settings.write().await;
        settings.get_or_insert_with(GameSettingsEntity::default).total_steps = total_steps;
    }
}

impl ProgressStore for InMemoryProgressStore {
    fn find_group(&self, id: GroupId) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let _tables = store.inner.tables.read().await;
            Ok(store.inner.groups.get(&id).map(|row| row.clone()))
        })
    }

    fn find_step(
        &self,
        pathway: Pathway,
        position: u32,
    ) -> BoxFuture<'static, StorageResult<Option<StepEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .steps
                .get(&(pathway, position))
                .map(|row| row.clone()))
        })
    }

    fn game_settings(&self) -> BoxFuture<'static, StorageResult<GameSettingsEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let settings = store.inner.settings.read().await;
            Ok(settings.clone().unwrap_or_default())
        })
    }

    fn persist_advance(
        &self,
        id: GroupId,
        expected_step: u32,
        total_steps: u32,
    ) -> BoxFuture<'static, StorageResult<AdvanceWrite>> {
        let store = self.clone();
        Box::pin(async move {
            let _tables = store.inner.tables.read().await;
            let Some(mut row) = store.inner.groups.get_mut(&id) else {
                return Ok(AdvanceWrite::Stale);
            };
            if row.completed || row.current_step != expected_step {
                return Ok(AdvanceWrite::Stale);
            }

            let next = advanced(row.clone(), total_steps, SystemTime::now());
            *row = next.clone();
            Ok(AdvanceWrite::Persisted(next))
        })
    }

    fn list_groups_for_leaderboard(&self) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let _tables = store.inner.tables.read().await;
            Ok(store
                .inner
                .groups
                .iter()
                .map(|row| row.value().clone())
                .collect())
        })
    }

    fn start_game(&self, at: SystemTime) -> BoxFuture<'static, StorageResult<LifecycleWrite>> {
        let store = self.clone();
        Box::pin(async move {
            let mut guard = store.inner.settings.write().await;
            let settings = guard.get_or_insert_with(GameSettingsEntity::default);
            if settings.started {
                return Ok(LifecycleWrite::AlreadyStarted);
            }
            settings.started = true;
            settings.started_at = Some(at);
            Ok(LifecycleWrite::Applied(settings.clone()))
        })
    }

    fn end_game(&self) -> BoxFuture<'static, StorageResult<LifecycleWrite>> {
        let store = self.clone();
        Box::pin(async move {
            let mut guard = store.inner.settings.write().await;
            let settings = guard.get_or_insert_with(GameSettingsEntity::default);
            if !settings.started {
                return Ok(LifecycleWrite::NotStarted);
            }
            if settings.ended {
                return Ok(LifecycleWrite::AlreadyEnded);
            }
            settings.ended = true;
            Ok(LifecycleWrite::Applied(settings.clone()))
        })
    }

    fn reset_progress(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let _tables = store.inner.tables.write().await;
            {
                let mut guard = store.inner.settings.write().await;
                let settings = guard.get_or_insert_with(GameSettingsEntity::default);
                settings.started = false;
                settings.ended = false;
                settings.started_at = None;
            }
            for mut row in store.inner.groups.iter_mut() {
                row.current_step = 0;
                row.completed = false;
                row.completed_at = None;
            }
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_group(current_step: u32) -> (InMemoryProgressStore, GroupId) {
        let store = InMemoryProgressStore::new();
        let mut group = GroupEntity::new("Foxes", Pathway::Blue, "pw");
        group.current_step = current_step;
        let id = group.id;
        store.insert_group(group);
        (store, id)
    }

    #[tokio::test]
    async fn missing_settings_fall_back_to_defaults() {
        let store = InMemoryProgressStore::new();
        assert_eq!(
            store.game_settings().await.unwrap(),
            GameSettingsEntity::default()
        );
    }

    #[tokio::test]
    async fn persist_advance_rejects_unexpected_step() {
        let (store, id) = store_with_group(1);
        let write = store.persist_advance(id, 0, 3).await.unwrap();
        assert_eq!(write, AdvanceWrite::Stale);
        let group = store.find_group(id).await.unwrap().unwrap();
        assert_eq!(group.current_step, 1);
    }

    #[tokio::test]
    async fn persist_advance_completes_and_then_goes_stale() {
        let (store, id) = store_with_group(2);
        let AdvanceWrite::Persisted(group) = store.persist_advance(id, 2, 3).await.unwrap() else {
            panic!("expected the advance to be persisted");
        };
        assert!(group.completed);
        let stamped = group.completed_at;
        assert!(stamped.is_some());

        assert_eq!(
            store.persist_advance(id, 3, 3).await.unwrap(),
            AdvanceWrite::Stale
        );
        let stored = store.find_group(id).await.unwrap().unwrap();
        assert_eq!(stored.current_step, 3);
        assert_eq!(stored.completed_at, stamped);
    }

    #[tokio::test]
    async fn persist_advance_on_unknown_group_is_stale() {
        let store = InMemoryProgressStore::new();
        let write = store
            .persist_advance(GroupId::new_v4(), 0, 1)
            .await
            .unwrap();
        assert_eq!(write, AdvanceWrite::Stale);
    }

    #[tokio::test]
    async fn lifecycle_transitions_are_guarded() {
        let store = InMemoryProgressStore::new();
        assert_eq!(store.end_game().await.unwrap(), LifecycleWrite::NotStarted);

        let at = SystemTime::now();
        let LifecycleWrite::Applied(settings) = store.start_game(at).await.unwrap() else {
            panic!("expected the game to start");
        };
        assert_eq!(settings.started_at, Some(at));
        assert_eq!(
            store.start_game(SystemTime::now()).await.unwrap(),
            LifecycleWrite::AlreadyStarted
        );

        assert!(matches!(
            store.end_game().await.unwrap(),
            LifecycleWrite::Applied(_)
        ));
        assert_eq!(store.end_game().await.unwrap(), LifecycleWrite::AlreadyEnded);
    }

    #[tokio::test]
    async fn reset_clears_groups_and_settings() {
        let (store, id) = store_with_group(2);
        store.set_total_steps(3).await;
        store.start_game(SystemTime::now()).await.unwrap();
        store.persist_advance(id, 2, 3).await.unwrap();

        store.reset_progress().await.unwrap();

        let group = store.find_group(id).await.unwrap().unwrap();
        assert_eq!(group.current_step, 0);
        assert!(!group.completed);
        assert!(group.completed_at.is_none());

        let settings = store.game_settings().await.unwrap();
        assert_eq!(settings.total_steps, 3);
        assert!(!settings.started && !settings.ended);
        assert!(settings.started_at.is_none());
    }
}

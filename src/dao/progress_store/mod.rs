/// Ephemeral backend for tests and single-process runs.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::SystemTime;

use futures::future::BoxFuture;

use crate::dao::{
    models::{GameSettingsEntity, GroupEntity, GroupId, Pathway, StepEntity},
    storage::StorageResult,
};

pub use self::memory::InMemoryProgressStore;

/// Result of the conditional progress write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceWrite {
    /// The row was still at the expected step and has been advanced by one.
    Persisted(GroupEntity),
    /// The row moved (or completed) since it was read; nothing was written.
    Stale,
}

/// Result of a game lifecycle write against the settings row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleWrite {
    /// The transition was applied; carries the updated settings.
    Applied(GameSettingsEntity),
    AlreadyStarted,
    NotStarted,
    AlreadyEnded,
}

/// Abstraction over the persistence layer owning groups, steps and game settings.
///
/// Every mutating method is atomic: it either applies completely or leaves the
/// stored state untouched.
pub trait ProgressStore: Send + Sync {
    fn find_group(&self, id: GroupId) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>>;
    fn find_step(
        &self,
        pathway: Pathway,
        position: u32,
    ) -> BoxFuture<'static, StorageResult<Option<StepEntity>>>;
    /// Current settings, or [`GameSettingsEntity::default`] when none were stored.
    fn game_settings(&self) -> BoxFuture<'static, StorageResult<GameSettingsEntity>>;
    /// Advance `id` by exactly one step if it still sits at `expected_step` and
    /// is not completed, recomputing completion against `total_steps`.
    fn persist_advance(
        &self,
        id: GroupId,
        expected_step: u32,
        total_steps: u32,
    ) -> BoxFuture<'static, StorageResult<AdvanceWrite>>;
    fn list_groups_for_leaderboard(&self) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>>;
    fn start_game(&self, at: SystemTime) -> BoxFuture<'static, StorageResult<LifecycleWrite>>;
    fn end_game(&self) -> BoxFuture<'static, StorageResult<LifecycleWrite>>;
    /// Put the game back into its not-started state and every group back to step zero.
    fn reset_progress(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Compute the post-advance state of `group`; shared by every backend so the
/// completion rule lives in one place.
pub(crate) fn advanced(mut group: GroupEntity, total_steps: u32, now: SystemTime) -> GroupEntity {
    group.current_step += 1;
    group.completed = group.current_step >= total_steps;
    if group.completed && group.completed_at.is_none() {
        group.completed_at = Some(now);
    }
    group
}

//! Pure ranking of groups into a leaderboard snapshot.

use std::{
    cmp::Ordering,
    time::{Duration, SystemTime},
};

use serde::Serialize;
use utoipa::ToSchema;

use crate::dao::models::{GroupEntity, GroupId, Pathway};

/// Medal shown next to the first three ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum Badge {
    #[serde(rename = "🥇")]
    Gold,
    #[serde(rename = "🥈")]
    Silver,
    #[serde(rename = "🥉")]
    Bronze,
}

impl Badge {
    fn for_rank(rank: usize) -> Option<Self> {
        match rank {
            1 => Some(Badge::Gold),
            2 => Some(Badge::Silver),
            3 => Some(Badge::Bronze),
            _ => None,
        }
    }
}

/// One ranked row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// Group identifier.
    #[schema(value_type = String, format = Uuid)]
    pub id: GroupId,
    /// 1-based position.
    pub rank: usize,
    /// Medal for the first three ranks.
    pub badge: Option<Badge>,
    /// Display name.
    pub name: String,
    /// Track the group follows.
    pub pathway: Pathway,
    /// Steps cleared so far.
    pub current_step: u32,
    /// Whether every step is cleared.
    pub completed: bool,
    /// Time from game start to completion, `M:SS` or `H:MM:SS`.
    pub elapsed: Option<String>,
}

/// Ranked projection of every group at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaderboardSnapshot {
    /// Ranked rows, best first.
    pub groups: Vec<LeaderboardEntry>,
    /// Steps required to complete the hunt.
    pub total_steps: u32,
    /// Number of groups.
    pub total_groups: usize,
    /// Groups that cleared every step.
    pub completed_groups: usize,
    /// Groups not yet done.
    pub in_progress_groups: usize,
}

/// Rank `groups` into a snapshot.
///
/// Ordering is completed first, then furthest step, then earliest completion
/// (unknown completion last), then id. Ranks are distinct and start at 1.
pub fn compose(
    total_steps: u32,
    started_at: Option<SystemTime>,
    mut groups: Vec<GroupEntity>,
) -> LeaderboardSnapshot {
    groups.sort_by(leaderboard_order);

    let total_groups = groups.len();
    let completed_groups = groups.iter().filter(|group| group.completed).count();

    let entries = groups
        .into_iter()
        .enumerate()
        .map(|(index, group)| {
            let rank = index + 1;
            let elapsed = elapsed_for(&group, started_at).map(format_elapsed);
            LeaderboardEntry {
                id: group.id,
                rank,
                badge: Badge::for_rank(rank),
                name: group.name,
                pathway: group.pathway,
                current_step: group.current_step,
                completed: group.completed,
                elapsed,
            }
        })
        .collect();

    LeaderboardSnapshot {
        groups: entries,
        total_steps,
        total_groups,
        completed_groups,
        in_progress_groups: total_groups - completed_groups,
    }
}

fn leaderboard_order(a: &GroupEntity, b: &GroupEntity) -> Ordering {
    b.completed
        .cmp(&a.completed)
        .then_with(|| b.current_step.cmp(&a.current_step))
        .then_with(|| match (a.completed_at, b.completed_at) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.cmp(&b.id))
}

fn elapsed_for(group: &GroupEntity, started_at: Option<SystemTime>) -> Option<Duration> {
    if !group.completed {
        return None;
    }
    let (started_at, completed_at) = (started_at?, group.completed_at?);
    Some(
        completed_at
            .duration_since(started_at)
            .unwrap_or(Duration::ZERO),
    )
}

/// Render a duration as `M:SS`, or `H:MM:SS` once it reaches an hour.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

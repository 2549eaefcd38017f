/// Per-group scan serialization.
pub mod group_locks;
/// Broadcast actor with latest-value replay.
pub mod hub;
/// Pure leaderboard ranking.
pub mod leaderboard;

use std::sync::Arc;

use tokio::sync::{Notify, RwLock, watch};
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig, dao::progress_store::ProgressStore, dto::sse::ServerEvent,
    error::ServiceError,
};

pub use self::group_locks::{GroupGuard, GroupLocks};
pub use self::hub::{BroadcastHub, HubClosed, HubStats, Subscription};

/// Shared handle passed to handlers and background tasks.
pub type SharedState = Arc<AppState>;

/// Hub carrying serialized leaderboard snapshots to SSE subscribers.
pub type LeaderboardHub = BroadcastHub<Arc<ServerEvent>>;

/// Central application state: the storage handle, the leaderboard hub and the
/// coordination primitives shared by request handlers and background tasks.
pub struct AppState {
    progress_store: RwLock<Option<Arc<dyn ProgressStore>>>,
    leaderboard: LeaderboardHub,
    group_locks: GroupLocks,
    refresh: Notify,
    degraded: watch::Sender<bool>,
    shutdown: CancellationToken,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    /// Must be called from within a Tokio runtime since it spawns the hub actor.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            progress_store: RwLock::new(None),
            leaderboard: BroadcastHub::new(config.subscriber_buffer),
            group_locks: GroupLocks::new(),
            refresh: Notify::new(),
            degraded: degraded_tx,
            shutdown: CancellationToken::new(),
            config,
        })
    }

    /// Obtain a handle to the current progress store, if one is installed.
    pub async fn progress_store(&self) -> Option<Arc<dyn ProgressStore>> {
        let guard = self.progress_store.read().await;
        guard.as_ref().cloned()
    }

    /// Progress store usable right now, or [`ServiceError::Degraded`].
    pub async fn require_store(&self) -> Result<Arc<dyn ProgressStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.progress_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new progress store, leave degraded mode and refresh the leaderboard.
    pub async fn install_store(&self, store: Arc<dyn ProgressStore>) {
        {
            let mut guard = self.progress_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
        self.request_leaderboard_refresh();
    }

    /// Remove the current progress store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.progress_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Hub fanning leaderboard snapshots out to SSE clients.
    pub fn leaderboard_hub(&self) -> &LeaderboardHub {
        &self.leaderboard
    }

    /// Per-group scan locks.
    pub fn group_locks(&self) -> &GroupLocks {
        &self.group_locks
    }

    /// Ask the refresher task to recompose and publish the leaderboard.
    ///
    /// Requests made while one is already pending collapse into it.
    pub fn request_leaderboard_refresh(&self) {
        self.refresh.notify_one();
    }

    /// Resolves once a leaderboard refresh has been requested.
    pub async fn refresh_requested(&self) {
        self.refresh.notified().await;
    }

    /// Application-wide shutdown token; SSE subscriptions are children of it.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Runtime configuration loaded at startup.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

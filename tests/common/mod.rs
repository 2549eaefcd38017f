#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use hunt_board::{
    config::AppConfig,
    dao::{
        models::{GroupEntity, GroupId, Pathway, StepEntity},
        progress_store::InMemoryProgressStore,
    },
    state::{AppState, SharedState},
};

/// Code expected at `position` of `pathway`.
pub fn code_for(pathway: Pathway, position: u32) -> String {
    format!("{pathway}-{position}").to_uppercase()
}

/// Memory store with `total_steps` steps configured on every pathway.
pub async fn store_with_steps(total_steps: u32) -> InMemoryProgressStore {
    let store = InMemoryProgressStore::new();
    store.set_total_steps(total_steps).await;
    for pathway in Pathway::ALL {
        for position in 0..total_steps {
            store.insert_step(StepEntity {
                pathway,
                position,
                content: format!("clue {position} of {pathway}"),
                code: code_for(pathway, position),
            });
        }
    }
    store
}

/// Insert a group sitting at `current_step` and return its id.
pub fn add_group(
    store: &InMemoryProgressStore,
    name: &str,
    pathway: Pathway,
    current_step: u32,
) -> GroupId {
    let mut group = GroupEntity::new(name, pathway, format!("{name}-secret"));
    group.current_step = current_step;
    let id = group.id;
    store.insert_group(group);
    id
}

pub fn fast_config() -> AppConfig {
    AppConfig {
        subscriber_buffer: 4,
        refresh_timeout: Duration::from_secs(1),
        keep_alive: Duration::from_secs(15),
    }
}

/// Application state backed by `store`, out of degraded mode.
pub async fn state_for(store: &InMemoryProgressStore) -> SharedState {
    let state = AppState::new(fast_config());
    state.install_store(Arc::new(store.clone())).await;
    state
}

use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, ClientSession, Collection, Database, IndexModel,
    bson::{Bson, DateTime, doc},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use tracing::warn;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
    models::{
        GROUP_COLLECTION_NAME, MongoGroupDocument, MongoSettingsDocument, MongoStepDocument,
        SETTINGS_COLLECTION_NAME, SETTINGS_ID, STEP_COLLECTION_NAME, doc_id,
    },
};
use crate::dao::{
    models::{GameSettingsEntity, GroupEntity, GroupId, Pathway, StepEntity},
    progress_store::{AdvanceWrite, LifecycleWrite, ProgressStore},
    storage::StorageResult,
};

/// MongoDB-backed [`ProgressStore`].
///
/// Progress writes are single-document conditional updates, which MongoDB
/// applies atomically under the document's write lock. The reset spans two
/// collections and therefore runs inside a session transaction, which requires
/// a replica set deployment.
#[derive(Clone)]
pub struct MongoProgressStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = self.config.connect().await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoProgressStore {
    /// Establish a connection, ensure indexes and make sure the settings document exists.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = config.connect().await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        store.ensure_settings().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let step_index = IndexModel::builder()
            .keys(doc! {"pathway": 1, "position": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("step_pathway_position_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        self.steps()
            .await
            .create_index(step_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: STEP_COLLECTION_NAME,
                index: "pathway,position",
                source,
            })?;

        let name_index = IndexModel::builder()
            .keys(doc! {"name": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("group_name_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        self.groups()
            .await
            .create_index(name_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: GROUP_COLLECTION_NAME,
                index: "name",
                source,
            })?;

        Ok(())
    }

    async fn ensure_settings(&self) -> MongoResult<()> {
        let defaults = GameSettingsEntity::default();
        self.settings()
            .await
            .update_one(
                doc! {"_id": SETTINGS_ID},
                doc! {"$setOnInsert": {
                    "total_steps": i64::from(defaults.total_steps),
                    "started_at": Bson::Null,
                    "started": false,
                    "ended": false,
                }},
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Settings {
                action: "initialise",
                source,
            })?;
        Ok(())
    }

    async fn client(&self) -> Client {
        let guard = self.inner.state.read().await;
        guard.client.clone()
    }

    async fn groups(&self) -> Collection<MongoGroupDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoGroupDocument>(GROUP_COLLECTION_NAME)
    }

    async fn steps(&self) -> Collection<MongoStepDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoStepDocument>(STEP_COLLECTION_NAME)
    }

    async fn settings(&self) -> Collection<MongoSettingsDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoSettingsDocument>(SETTINGS_COLLECTION_NAME)
    }

    async fn find_group(&self, id: GroupId) -> MongoResult<Option<GroupEntity>> {
        let document = self
            .groups()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadGroup { id, source })?;

        document.map(GroupEntity::try_from).transpose()
    }

    async fn find_step(&self, pathway: Pathway, position: u32) -> MongoResult<Option<StepEntity>> {
        let document = self
            .steps()
            .await
            .find_one(doc! {"pathway": pathway.as_str(), "position": i64::from(position)})
            .await
            .map_err(|source| MongoDaoError::LoadStep {
                pathway,
                position,
                source,
            })?;

        document.map(StepEntity::try_from).transpose()
    }

    async fn game_settings(&self) -> MongoResult<GameSettingsEntity> {
        let document = self
            .settings()
            .await
            .find_one(doc! {"_id": SETTINGS_ID})
            .await
            .map_err(|source| MongoDaoError::Settings {
                action: "load",
                source,
            })?;

        match document {
            Some(document) => document.try_into(),
            None => Ok(GameSettingsEntity::default()),
        }
    }

    async fn persist_advance(
        &self,
        id: GroupId,
        expected_step: u32,
        total_steps: u32,
    ) -> MongoResult<AdvanceWrite> {
        let next_step = expected_step + 1;
        let completed = next_step >= total_steps;
        // The filter only matches rows that are not completed yet, so
        // `completed_at` is still unset whenever completion is reached here.
        let mut set = doc! {"current_step": i64::from(next_step), "completed": completed};
        if completed {
            set.insert(
                "completed_at",
                DateTime::from_system_time(SystemTime::now()),
            );
        }

        let mut filter = doc_id(id);
        filter.insert("current_step", i64::from(expected_step));
        filter.insert("completed", false);

        let updated = self
            .groups()
            .await
            .find_one_and_update(filter, doc! {"$set": set})
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::AdvanceGroup { id, source })?;

        match updated {
            Some(document) => Ok(AdvanceWrite::Persisted(document.try_into()?)),
            None => Ok(AdvanceWrite::Stale),
        }
    }

    async fn list_groups(&self) -> MongoResult<Vec<GroupEntity>> {
        let documents: Vec<MongoGroupDocument> = self
            .groups()
            .await
            .find(doc! {})
            .sort(doc! {"completed": -1, "current_step": -1, "completed_at": 1, "_id": 1})
            .await
            .map_err(|source| MongoDaoError::ListGroups { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListGroups { source })?;

        documents.into_iter().map(GroupEntity::try_from).collect()
    }

    async fn start_game(&self, at: SystemTime) -> MongoResult<LifecycleWrite> {
        let updated = self
            .settings()
            .await
            .find_one_and_update(
                doc! {"_id": SETTINGS_ID, "started": false},
                doc! {"$set": {"started": true, "started_at": DateTime::from_system_time(at)}},
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::Settings {
                action: "start",
                source,
            })?;

        match updated {
            Some(document) => Ok(LifecycleWrite::Applied(document.try_into()?)),
            None => Ok(LifecycleWrite::AlreadyStarted),
        }
    }

    async fn end_game(&self) -> MongoResult<LifecycleWrite> {
        let updated = self
            .settings()
            .await
            .find_one_and_update(
                doc! {"_id": SETTINGS_ID, "started": true, "ended": false},
                doc! {"$set": {"ended": true}},
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::Settings {
                action: "end",
                source,
            })?;

        if let Some(document) = updated {
            return Ok(LifecycleWrite::Applied(document.try_into()?));
        }

        let current = self.game_settings().await?;
        if current.started {
            Ok(LifecycleWrite::AlreadyEnded)
        } else {
            Ok(LifecycleWrite::NotStarted)
        }
    }

    async fn reset_progress(&self) -> MongoResult<()> {
        let client = self.client().await;
        let mut session = client
            .start_session()
            .await
            .map_err(|source| MongoDaoError::Reset {
                stage: "start session",
                source,
            })?;
        session
            .start_transaction()
            .await
            .map_err(|source| MongoDaoError::Reset {
                stage: "start transaction",
                source,
            })?;

        if let Err(err) = self.reset_in_session(&mut session).await {
            if let Err(abort_err) = session.abort_transaction().await {
                warn!(error = %abort_err, "failed to abort progress reset transaction");
            }
            return Err(err);
        }

        session
            .commit_transaction()
            .await
            .map_err(|source| MongoDaoError::Reset {
                stage: "commit",
                source,
            })
    }

    async fn reset_in_session(&self, session: &mut ClientSession) -> MongoResult<()> {
        self.settings()
            .await
            .update_one(
                doc! {"_id": SETTINGS_ID},
                doc! {"$set": {"started": false, "ended": false, "started_at": Bson::Null}},
            )
            .session(&mut *session)
            .await
            .map_err(|source| MongoDaoError::Reset {
                stage: "settings update",
                source,
            })?;

        self.groups()
            .await
            .update_many(
                doc! {},
                doc! {"$set": {"current_step": 0_i64, "completed": false, "completed_at": Bson::Null}},
            )
            .session(&mut *session)
            .await
            .map_err(|source| MongoDaoError::Reset {
                stage: "groups update",
                source,
            })?;

        Ok(())
    }
}

impl ProgressStore for MongoProgressStore {
    fn find_group(&self, id: GroupId) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_group(id).await.map_err(Into::into) })
    }

    fn find_step(
        &self,
        pathway: Pathway,
        position: u32,
    ) -> BoxFuture<'static, StorageResult<Option<StepEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_step(pathway, position).await.map_err(Into::into) })
    }

    fn game_settings(&self) -> BoxFuture<'static, StorageResult<GameSettingsEntity>> {
        let store = self.clone();
        Box::pin(async move { store.game_settings().await.map_err(Into::into) })
    }

    fn persist_advance(
        &self,
        id: GroupId,
        expected_step: u32,
        total_steps: u32,
    ) -> BoxFuture<'static, StorageResult<AdvanceWrite>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .persist_advance(id, expected_step, total_steps)
                .await
                .map_err(Into::into)
        })
    }

    fn list_groups_for_leaderboard(&self) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_groups().await.map_err(Into::into) })
    }

    fn start_game(&self, at: SystemTime) -> BoxFuture<'static, StorageResult<LifecycleWrite>> {
        let store = self.clone();
        Box::pin(async move { store.start_game(at).await.map_err(Into::into) })
    }

    fn end_game(&self) -> BoxFuture<'static, StorageResult<LifecycleWrite>> {
        let store = self.clone();
        Box::pin(async move { store.end_game().await.map_err(Into::into) })
    }

    fn reset_progress(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.reset_progress().await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}

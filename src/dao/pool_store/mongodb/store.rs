use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database, IndexModel,
    bson::doc,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoCatalogMatchDocument, MongoPoolDocument, MongoPredictionDocument,
        MongoTournamentDocument, doc_id, prediction_id,
    },
};
use crate::dao::{
    models::{CatalogMatchEntity, PoolEntity, PredictionEntity, PredictionWrite, TournamentEntity},
    pool_store::{CatalogStore, PoolStore, Storage},
    storage::StorageResult,
};

const POOL_COLLECTION_NAME: &str = "pools";
const PREDICTION_COLLECTION_NAME: &str = "predictions";
const TOURNAMENT_COLLECTION_NAME: &str = "tournaments";
const MATCH_COLLECTION_NAME: &str = "matches";
const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed [`Storage`] implementation.
#[derive(Clone)]
pub struct MongoPoolStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: RwLock<Database>,
    config: MongoConfig,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.database.read().await.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (_client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        *self.database.write().await = database;
        Ok(())
    }
}

impl MongoPoolStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (_client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let store = Self {
            inner: Arc::new(MongoInner {
                database: RwLock::new(database),
                config,
            }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let pools = database.collection::<mongodb::bson::Document>(POOL_COLLECTION_NAME);
        let participants_index = IndexModel::builder()
            .keys(doc! {"participants": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("pool_participants_idx".to_owned()))
                    .build(),
            )
            .build();
        pools
            .create_index(participants_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: POOL_COLLECTION_NAME,
                index: "participants",
                source,
            })?;

        let predictions = database.collection::<mongodb::bson::Document>(PREDICTION_COLLECTION_NAME);
        let by_pool_index = IndexModel::builder()
            .keys(doc! {"pool_id": 1, "user_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("prediction_pool_user_idx".to_owned()))
                    .build(),
            )
            .build();
        predictions
            .create_index(by_pool_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PREDICTION_COLLECTION_NAME,
                index: "pool_id,user_id",
                source,
            })?;

        let tournaments = database.collection::<mongodb::bson::Document>(TOURNAMENT_COLLECTION_NAME);
        let name_season_index = IndexModel::builder()
            .keys(doc! {"name": 1, "season": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("tournament_name_season_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        tournaments
            .create_index(name_season_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: TOURNAMENT_COLLECTION_NAME,
                index: "name,season",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        self.inner.database.read().await.clone()
    }

    async fn pool_collection(&self) -> Collection<MongoPoolDocument> {
        self.database().await.collection(POOL_COLLECTION_NAME)
    }

    async fn prediction_collection(&self) -> Collection<MongoPredictionDocument> {
        self.database().await.collection(PREDICTION_COLLECTION_NAME)
    }

    async fn tournament_collection(&self) -> Collection<MongoTournamentDocument> {
        self.database().await.collection(TOURNAMENT_COLLECTION_NAME)
    }

    async fn match_collection(&self) -> Collection<MongoCatalogMatchDocument> {
        self.database().await.collection(MATCH_COLLECTION_NAME)
    }

    async fn save_pool(&self, pool: PoolEntity) -> MongoResult<()> {
        let id = pool.id;
        let document: MongoPoolDocument = pool.into();
        self.pool_collection()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SavePool { id, source })?;
        Ok(())
    }

    async fn find_pool(&self, id: Uuid) -> MongoResult<Option<PoolEntity>> {
        let document = self
            .pool_collection()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadPool { id, source })?;
        document.map(PoolEntity::try_from).transpose()
    }

    async fn list_pools_matching(
        &self,
        filter: mongodb::bson::Document,
    ) -> MongoResult<Vec<PoolEntity>> {
        let documents: Vec<MongoPoolDocument> = self
            .pool_collection()
            .await
            .find(filter)
            .await
            .map_err(|source| MongoDaoError::ListPools { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListPools { source })?;

        documents.into_iter().map(PoolEntity::try_from).collect()
    }

    async fn delete_pool(&self, id: Uuid) -> MongoResult<bool> {
        self.prediction_collection()
            .await
            .delete_many(doc! {"pool_id": id.to_string()})
            .await
            .map_err(|source| MongoDaoError::DeletePredictions {
                pool_id: id,
                source,
            })?;

        let result = self
            .pool_collection()
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeletePool { id, source })?;
        Ok(result.deleted_count > 0)
    }

    /// Replace the stored prediction only if it is not newer than `prediction`.
    ///
    /// A newer stored entry makes the filter miss, so the upsert collides on `_id`.
    async fn upsert_prediction(&self, prediction: PredictionEntity) -> MongoResult<PredictionWrite> {
        let key = prediction_id(prediction.pool_id, prediction.match_id, &prediction.user_id);
        let submitted_at = prediction.submitted_at;
        let document: MongoPredictionDocument = prediction.into();

        let outcome = self
            .prediction_collection()
            .await
            .replace_one(
                doc! {"_id": key.as_str(), "submitted_at": {"$lte": submitted_at}},
                &document,
            )
            .upsert(true)
            .await;

        match outcome {
            Ok(_) => Ok(PredictionWrite::Applied),
            Err(err) if is_duplicate_key(&err) => Ok(PredictionWrite::Superseded),
            Err(source) => Err(MongoDaoError::SavePrediction { key, source }),
        }
    }

    async fn list_predictions_matching(
        &self,
        pool_id: Uuid,
        filter: mongodb::bson::Document,
    ) -> MongoResult<Vec<PredictionEntity>> {
        let documents: Vec<MongoPredictionDocument> = self
            .prediction_collection()
            .await
            .find(filter)
            .sort(doc! {"match_id": 1, "user_id": 1})
            .await
            .map_err(|source| MongoDaoError::ListPredictions { pool_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListPredictions { pool_id, source })?;

        documents
            .into_iter()
            .map(PredictionEntity::try_from)
            .collect()
    }

    async fn delete_user_predictions(&self, pool_id: Uuid, user_id: String) -> MongoResult<u64> {
        let result = self
            .prediction_collection()
            .await
            .delete_many(doc! {"pool_id": pool_id.to_string(), "user_id": user_id})
            .await
            .map_err(|source| MongoDaoError::DeletePredictions { pool_id, source })?;
        Ok(result.deleted_count)
    }

    async fn save_tournament(&self, tournament: TournamentEntity) -> MongoResult<()> {
        let id = tournament.id;
        let document: MongoTournamentDocument = tournament.into();
        self.tournament_collection()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveCatalog {
                collection: TOURNAMENT_COLLECTION_NAME,
                id,
                source,
            })?;
        Ok(())
    }

    async fn find_tournament_matching(
        &self,
        filter: mongodb::bson::Document,
    ) -> MongoResult<Option<TournamentEntity>> {
        self.tournament_collection()
            .await
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::LoadCatalog {
                collection: TOURNAMENT_COLLECTION_NAME,
                source,
            })?
            .map(TournamentEntity::try_from)
            .transpose()
    }

    async fn list_tournaments(&self) -> MongoResult<Vec<TournamentEntity>> {
        let documents: Vec<MongoTournamentDocument> = self
            .tournament_collection()
            .await
            .find(doc! {})
            .sort(doc! {"start_date": 1, "name": 1})
            .await
            .map_err(|source| MongoDaoError::LoadCatalog {
                collection: TOURNAMENT_COLLECTION_NAME,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadCatalog {
                collection: TOURNAMENT_COLLECTION_NAME,
                source,
            })?;
        documents
            .into_iter()
            .map(TournamentEntity::try_from)
            .collect()
    }

    async fn save_catalog_match(&self, catalog_match: CatalogMatchEntity) -> MongoResult<()> {
        let id = catalog_match.id;
        let document: MongoCatalogMatchDocument = catalog_match.into();
        self.match_collection()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveCatalog {
                collection: MATCH_COLLECTION_NAME,
                id,
                source,
            })?;
        Ok(())
    }

    async fn find_catalog_match(&self, id: Uuid) -> MongoResult<Option<CatalogMatchEntity>> {
        self.match_collection()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadCatalog {
                collection: MATCH_COLLECTION_NAME,
                source,
            })?
            .map(CatalogMatchEntity::try_from)
            .transpose()
    }

    async fn list_catalog_matches(&self, tournament_id: Uuid) -> MongoResult<Vec<CatalogMatchEntity>> {
        let documents: Vec<MongoCatalogMatchDocument> = self
            .match_collection()
            .await
            .find(doc! {"tournament_id": tournament_id.to_string()})
            .sort(doc! {"match_date": 1})
            .await
            .map_err(|source| MongoDaoError::LoadCatalog {
                collection: MATCH_COLLECTION_NAME,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadCatalog {
                collection: MATCH_COLLECTION_NAME,
                source,
            })?;
        documents
            .into_iter()
            .map(CatalogMatchEntity::try_from)
            .collect()
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

impl PoolStore for MongoPoolStore {
    fn save_pool(&self, pool: PoolEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_pool(pool).await.map_err(Into::into) })
    }

    fn find_pool(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PoolEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_pool(id).await.map_err(Into::into) })
    }

    fn list_pools(&self) -> BoxFuture<'static, StorageResult<Vec<PoolEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_pools_matching(doc! {}).await.map_err(Into::into) })
    }

    fn list_pools_for_user(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<PoolEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_pools_matching(doc! {"participants": user_id})
                .await
                .map_err(Into::into)
        })
    }

    fn delete_pool(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_pool(id).await.map_err(Into::into) })
    }

    fn upsert_prediction(
        &self,
        prediction: PredictionEntity,
    ) -> BoxFuture<'static, StorageResult<PredictionWrite>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_prediction(prediction).await.map_err(Into::into) })
    }

    fn list_predictions(
        &self,
        pool_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PredictionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_predictions_matching(pool_id, doc! {"pool_id": pool_id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn list_user_predictions(
        &self,
        pool_id: Uuid,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<PredictionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_predictions_matching(
                    pool_id,
                    doc! {"pool_id": pool_id.to_string(), "user_id": user_id},
                )
                .await
                .map_err(Into::into)
        })
    }

    fn delete_user_predictions(
        &self,
        pool_id: Uuid,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_user_predictions(pool_id, user_id)
                .await
                .map_err(Into::into)
        })
    }
}

impl CatalogStore for MongoPoolStore {
    fn save_tournament(
        &self,
        tournament: TournamentEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_tournament(tournament).await.map_err(Into::into) })
    }

    fn find_tournament(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_tournament_matching(doc_id(id))
                .await
                .map_err(Into::into)
        })
    }

    fn find_tournament_by_name(
        &self,
        name: String,
        season: String,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_tournament_matching(doc! {"name": name, "season": season})
                .await
                .map_err(Into::into)
        })
    }

    fn list_tournaments(&self) -> BoxFuture<'static, StorageResult<Vec<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_tournaments().await.map_err(Into::into) })
    }

    fn save_catalog_match(
        &self,
        catalog_match: CatalogMatchEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .save_catalog_match(catalog_match)
                .await
                .map_err(Into::into)
        })
    }

    fn find_catalog_match(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CatalogMatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_catalog_match(id).await.map_err(Into::into) })
    }

    fn list_catalog_matches(
        &self,
        tournament_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<CatalogMatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_catalog_matches(tournament_id)
                .await
                .map_err(Into::into)
        })
    }
}

impl Storage for MongoPoolStore {
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}

pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{
    CatalogMatchEntity, PoolEntity, PredictionEntity, PredictionWrite, TournamentEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Remote authoritative store for pools and their predictions.
pub trait PoolStore: Send + Sync {
    /// Insert or replace the whole pool record.
    fn save_pool(&self, pool: PoolEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_pool(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PoolEntity>>>;
    fn list_pools(&self) -> BoxFuture<'static, StorageResult<Vec<PoolEntity>>>;
    fn list_pools_for_user(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<PoolEntity>>>;
    /// Delete a pool and every prediction attached to it.
    fn delete_pool(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Store `prediction` unless an entry with a newer timestamp already exists for its key.
    fn upsert_prediction(
        &self,
        prediction: PredictionEntity,
    ) -> BoxFuture<'static, StorageResult<PredictionWrite>>;
    fn list_predictions(
        &self,
        pool_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PredictionEntity>>>;
    fn list_user_predictions(
        &self,
        pool_id: Uuid,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<PredictionEntity>>>;
    /// Delete one participant's predictions in a pool, returning how many were removed.
    fn delete_user_predictions(
        &self,
        pool_id: Uuid,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<u64>>;
}

/// Persistence for the companion tournament/match catalog.
pub trait CatalogStore: Send + Sync {
    fn save_tournament(&self, tournament: TournamentEntity)
    -> BoxFuture<'static, StorageResult<()>>;
    fn find_tournament(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>>;
    fn find_tournament_by_name(
        &self,
        name: String,
        season: String,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>>;
    fn list_tournaments(&self) -> BoxFuture<'static, StorageResult<Vec<TournamentEntity>>>;
    fn save_catalog_match(
        &self,
        catalog_match: CatalogMatchEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn find_catalog_match(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CatalogMatchEntity>>>;
    fn list_catalog_matches(
        &self,
        tournament_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<CatalogMatchEntity>>>;
}

/// Full storage backend installed into the application state.
pub trait Storage: PoolStore + CatalogStore {
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

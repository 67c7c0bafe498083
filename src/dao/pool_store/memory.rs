//! In-process [`Storage`] backend used for development and tests.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{CatalogMatchEntity, PoolEntity, PredictionEntity, PredictionWrite, TournamentEntity},
    pool_store::{CatalogStore, PoolStore, Storage},
    storage::{StorageError, StorageResult},
};

/// Storage backend keeping every record in memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    pools: DashMap<Uuid, PoolEntity>,
    predictions: DashMap<(Uuid, i64, String), PredictionEntity>,
    tournaments: DashMap<Uuid, TournamentEntity>,
    matches: DashMap<Uuid, CatalogMatchEntity>,
    offline: AtomicBool,
    #[cfg(test)]
    prediction_gate: std::sync::Mutex<Option<Arc<tokio::sync::Semaphore>>>,
    #[cfg(test)]
    failing_prediction_deletes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every operation fails until availability is restored.
    pub fn set_available(&self, available: bool) {
        self.inner.offline.store(!available, Ordering::SeqCst);
    }

    /// Park prediction writes until the returned semaphore receives permits.
    #[cfg(test)]
    pub fn hold_prediction_writes(&self) -> Arc<tokio::sync::Semaphore> {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        if let Ok(mut slot) = self.inner.prediction_gate.lock() {
            *slot = Some(gate.clone());
        }
        gate
    }

    /// Make prediction cascades fail while the rest of the store keeps working.
    #[cfg(test)]
    pub fn fail_prediction_deletes(&self, failing: bool) {
        self.inner
            .failing_prediction_deletes
            .store(failing, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> StorageResult<()> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable(
                "memory store offline".into(),
                io::Error::new(io::ErrorKind::NotConnected, "simulated outage"),
            ));
        }
        Ok(())
    }

    fn upsert_prediction_sync(&self, prediction: PredictionEntity) -> PredictionWrite {
        let key = (
            prediction.pool_id,
            prediction.match_id,
            prediction.user_id.clone(),
        );
        match self.inner.predictions.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().submitted_at > prediction.submitted_at {
                    PredictionWrite::Superseded
                } else {
                    occupied.insert(prediction);
                    PredictionWrite::Applied
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(prediction);
                PredictionWrite::Applied
            }
        }
    }

    fn predictions_where(&self, keep: impl Fn(&PredictionEntity) -> bool) -> Vec<PredictionEntity> {
        let mut found: Vec<PredictionEntity> = self
            .inner
            .predictions
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| {
            a.match_id
                .cmp(&b.match_id)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        found
    }
}

impl PoolStore for MemoryStore {
    fn save_pool(&self, pool: PoolEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            store.inner.pools.insert(pool.id, pool);
            Ok(())
        })
    }

    fn find_pool(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PoolEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            Ok(store.inner.pools.get(&id).map(|entry| entry.value().clone()))
        })
    }

    fn list_pools(&self) -> BoxFuture<'static, StorageResult<Vec<PoolEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            Ok(store
                .inner
                .pools
                .iter()
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn list_pools_for_user(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<PoolEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            Ok(store
                .inner
                .pools
                .iter()
                .filter(|entry| entry.participants.contains(&user_id))
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn delete_pool(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            let removed = store.inner.pools.remove(&id).is_some();
            store
                .inner
                .predictions
                .retain(|(pool_id, _, _), _| *pool_id != id);
            Ok(removed)
        })
    }

    fn upsert_prediction(
        &self,
        prediction: PredictionEntity,
    ) -> BoxFuture<'static, StorageResult<PredictionWrite>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            #[cfg(test)]
            {
                let gate = store
                    .inner
                    .prediction_gate
                    .lock()
                    .ok()
                    .and_then(|slot| slot.clone());
                if let Some(gate) = gate {
                    let _ = gate.acquire().await;
                }
            }
            Ok(store.upsert_prediction_sync(prediction))
        })
    }

    fn list_predictions(
        &self,
        pool_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PredictionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            Ok(store.predictions_where(|p| p.pool_id == pool_id))
        })
    }

    fn list_user_predictions(
        &self,
        pool_id: Uuid,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<PredictionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            Ok(store.predictions_where(|p| p.pool_id == pool_id && p.user_id == user_id))
        })
    }

    fn delete_user_predictions(
        &self,
        pool_id: Uuid,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            #[cfg(test)]
            if store.inner.failing_prediction_deletes.load(Ordering::SeqCst) {
                return Err(StorageError::unavailable(
                    "prediction delete refused".into(),
                    io::Error::other("simulated failure"),
                ));
            }
            let before = store.inner.predictions.len();
            store
                .inner
                .predictions
                .retain(|(pool, _, user), _| !(*pool == pool_id && *user == user_id));
            Ok(before.saturating_sub(store.inner.predictions.len()) as u64)
        })
    }
}

impl CatalogStore for MemoryStore {
    fn save_tournament(
        &self,
        tournament: TournamentEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            store.inner.tournaments.insert(tournament.id, tournament);
            Ok(())
        })
    }

    fn find_tournament(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            Ok(store
                .inner
                .tournaments
                .get(&id)
                .map(|entry| entry.value().clone()))
        })
    }

    fn find_tournament_by_name(
        &self,
        name: String,
        season: String,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            Ok(store
                .inner
                .tournaments
                .iter()
                .find(|entry| entry.name == name && entry.season == season)
                .map(|entry| entry.value().clone()))
        })
    }

    fn list_tournaments(&self) -> BoxFuture<'static, StorageResult<Vec<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            let mut tournaments: Vec<TournamentEntity> = store
                .inner
                .tournaments
                .iter()
                .map(|entry| entry.value().clone())
                .collect();
            tournaments.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.name.cmp(&b.name)));
            Ok(tournaments)
        })
    }

    fn save_catalog_match(
        &self,
        catalog_match: CatalogMatchEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            store.inner.matches.insert(catalog_match.id, catalog_match);
            Ok(())
        })
    }

    fn find_catalog_match(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CatalogMatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            Ok(store.inner.matches.get(&id).map(|entry| entry.value().clone()))
        })
    }

    fn list_catalog_matches(
        &self,
        tournament_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<CatalogMatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            let mut matches: Vec<CatalogMatchEntity> = store
                .inner
                .matches
                .iter()
                .filter(|entry| entry.tournament_id == tournament_id)
                .map(|entry| entry.value().clone())
                .collect();
            matches.sort_by_key(|m| m.match_date);
            Ok(matches)
        })
    }
}

impl Storage for MemoryStore {
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_available() })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_available() })
    }
}

pub mod fixture;
pub mod fixture_cache;
pub mod league;
pub mod match_lifecycle;
pub mod pool;
pub mod prediction;
pub mod session;
mod sse;
pub mod standings;

use std::sync::Arc;

use time::{Date, OffsetDateTime};
use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{fixtures::FixtureProvider, pool_store::Storage, snapshot::SnapshotFile},
    error::ServiceError,
    services::{
        prediction_service::LockNotifier, sse_events, standings_service::StandingsInvalidator,
    },
    state::{
        fixture_cache::FixtureCache,
        match_lifecycle::{MatchLifecycle, TransitionObserver},
        pool::LocalPools,
        prediction::SubmissionClock,
        session::SessionRegistry,
        standings::StandingsCache,
    },
};

pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;

const PUBLIC_SSE_CAPACITY: usize = 64;

/// Central application state: storage handle, caches, lifecycle registry and broadcast hub.
pub struct AppState {
    storage: RwLock<Option<Arc<dyn Storage>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    sse: SseHub,
    lifecycle: Arc<MatchLifecycle>,
    fixtures: FixtureCache,
    provider: Arc<dyn FixtureProvider>,
    pools: LocalPools,
    standings: Arc<StandingsCache>,
    sessions: SessionRegistry,
    clock: SubmissionClock,
    snapshot: SnapshotFile,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, provider: Arc<dyn FixtureProvider>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let sse = SseHub::new(PUBLIC_SSE_CAPACITY);
        let standings = Arc::new(StandingsCache::new());

        let observers: Vec<Arc<dyn TransitionObserver>> = vec![
            Arc::new(LockNotifier::new(sse.clone())),
            Arc::new(StandingsInvalidator::new(standings.clone(), sse.clone())),
        ];
        let lifecycle = Arc::new(MatchLifecycle::new(observers));
        let fixtures = FixtureCache::new(lifecycle.clone(), config.leagues().clone());
        let snapshot = SnapshotFile::new(config.snapshot_path().clone());

        Arc::new(Self {
            storage: RwLock::new(None),
            degraded: degraded_tx,
            config,
            sse,
            lifecycle,
            fixtures,
            provider,
            pools: LocalPools::default(),
            standings,
            sessions: SessionRegistry::new(),
            clock: SubmissionClock::new(),
            snapshot,
        })
    }

    /// Obtain a handle to the current storage backend, if one is installed.
    pub async fn storage(&self) -> Option<Arc<dyn Storage>> {
        let guard = self.storage.read().await;
        guard.as_ref().cloned()
    }

    /// Storage backend or [`ServiceError::Degraded`] while offline.
    pub async fn require_storage(&self) -> Result<Arc<dyn Storage>, ServiceError> {
        self.storage().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new storage implementation and leave degraded mode.
    pub async fn install_storage(&self, store: Arc<dyn Storage>) {
        {
            let mut guard = self.storage.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current storage backend and enter degraded mode.
    pub async fn clear_storage(&self) {
        {
            let mut guard = self.storage.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update the degraded flag, broadcasting `system.degraded` when it changes.
    pub fn update_degraded(&self, value: bool) -> bool {
        let changed = self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
        if changed {
            sse_events::broadcast_system_status(&self.sse, value);
        }
        changed
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.sse
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> &MatchLifecycle {
        &self.lifecycle
    }

    pub fn fixtures(&self) -> &FixtureCache {
        &self.fixtures
    }

    pub fn provider(&self) -> &dyn FixtureProvider {
        self.provider.as_ref()
    }

    /// Local cache of pools, mirrored to the snapshot file.
    pub fn pools(&self) -> &LocalPools {
        &self.pools
    }

    pub fn standings(&self) -> &StandingsCache {
        &self.standings
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn clock(&self) -> &SubmissionClock {
        &self.clock
    }

    pub fn snapshot(&self) -> &SnapshotFile {
        &self.snapshot
    }
}

/// Current UTC time truncated to milliseconds, the precision the remote store keeps.
pub fn timestamp_now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_millisecond(now.millisecond()).unwrap_or(now)
}

/// Current UTC calendar date.
pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

#[cfg(test)]
pub(crate) mod tests {
    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        dao::{fixtures::FetchError, pool_store::memory::MemoryStore},
        state::{
            fixture::Match,
            league::{LeagueInfo, Season},
        },
    };

    /// Provider that always fails; tests feed fixtures through the cache directly.
    pub(crate) struct OfflineProvider;

    impl FixtureProvider for OfflineProvider {
        fn fetch_matches(
            &self,
            _league: &LeagueInfo,
            _season: Season,
        ) -> BoxFuture<'static, Result<Vec<Match>, FetchError>> {
            Box::pin(async { Err(FetchError::Timeout) })
        }
    }

    /// State wired to a fresh in-memory store and a scratch snapshot file.
    pub(crate) async fn memory_state() -> (SharedState, MemoryStore) {
        let path = std::env::temp_dir()
            .join(format!("pollamania-state-{}", uuid::Uuid::new_v4()))
            .join("snapshot.json");
        let config = AppConfig::default().with_snapshot_path(path);
        let state = AppState::new(config, Arc::new(OfflineProvider));
        let store = MemoryStore::new();
        state.install_storage(Arc::new(store.clone())).await;
        (state, store)
    }

    #[tokio::test]
    async fn degraded_flag_follows_storage() {
        let state = AppState::new(AppConfig::default(), Arc::new(OfflineProvider));
        assert!(state.is_degraded());
        let mut events = state.public_sse().subscribe();

        state.install_storage(Arc::new(MemoryStore::new())).await;
        assert!(!state.is_degraded());
        assert!(state.require_storage().await.is_ok());
        let event = events.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("system.degraded"));

        state.clear_storage().await;
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_storage().await,
            Err(ServiceError::Degraded)
        ));
    }

    #[test]
    fn timestamps_are_millisecond_precise() {
        assert_eq!(timestamp_now().nanosecond() % 1_000_000, 0);
    }
}

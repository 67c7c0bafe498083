use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{pool_store::Storage, storage::StorageError},
    services::pool_service,
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect to the remote store and keep the shared state in degraded mode while it is
/// unreachable. Every (re)connection reconciles the local pool cache against the store.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn Storage>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_storage(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                reconcile(&state, &store).await;
                delay = INITIAL_DELAY;

                loop {
                    match store.health_check().await {
                        Ok(()) => {
                            if state.is_degraded() {
                                info!("storage healthy again; leaving degraded mode");
                                state.update_degraded(false);
                                reconcile(&state, &store).await;
                            }
                            sleep(HEALTH_POLL_INTERVAL).await;
                        }
                        Err(health_err) => {
                            warn!(error = %health_err, "storage health check failed");
                            if reconnect(&state, &store).await {
                                state.update_degraded(false);
                                reconcile(&state, &store).await;
                                sleep(HEALTH_POLL_INTERVAL).await;
                                continue;
                            }
                            warn!("exhausted storage reconnect attempts; staying in degraded mode");
                            state.clear_storage().await;
                            break;
                        }
                    }
                }

                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

async fn reconnect(state: &SharedState, store: &Arc<dyn Storage>) -> bool {
    let mut reconnect_delay = INITIAL_DELAY;
    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(
                        attempt,
                        error = %err,
                        "storage reconnect first attempt failed; entering degraded mode"
                    );
                    state.update_degraded(true);
                } else {
                    warn!(attempt, error = %err, "storage reconnect attempt failed");
                }
                sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
            }
        }
    }
    false
}

async fn reconcile(state: &SharedState, store: &Arc<dyn Storage>) {
    if let Err(err) = pool_service::reconcile(state, store).await {
        warn!(error = %err, "pool reconciliation failed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::pool_store::memory::MemoryStore,
        state::{AppState, tests::OfflineProvider},
    };

    #[tokio::test]
    async fn first_connection_leaves_degraded_mode() {
        let snapshot = std::env::temp_dir()
            .join(format!("pollamania-supervisor-{}", uuid::Uuid::new_v4()))
            .join("snapshot.json");
        let config = AppConfig::default().with_snapshot_path(snapshot);
        let state = AppState::new(config, Arc::new(OfflineProvider));
        let attempts = Arc::new(AtomicUsize::new(0));
        let store = MemoryStore::new();

        let supervisor = {
            let state = state.clone();
            let attempts = attempts.clone();
            tokio::spawn(run(state, move || {
                let attempts = attempts.clone();
                let store = store.clone();
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(StorageError::unavailable(
                            "not yet".into(),
                            std::io::Error::other("refused"),
                        ))
                    } else {
                        Ok(Arc::new(store) as Arc<dyn Storage>)
                    }
                }
            }))
        };

        sleep(Duration::from_millis(1_500)).await;
        assert!(!state.is_degraded());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        supervisor.abort();
    }
}

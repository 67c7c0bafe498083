use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report storage connectivity and the size of the local pool cache.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_storage().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    let cached_pools = state.pools().all().len();
    if state.is_degraded() {
        HealthResponse::degraded(cached_pools)
    } else {
        HealthResponse::ok(cached_pools)
    }
}

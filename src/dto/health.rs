use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Whether the remote store is currently reachable.
    pub storage: bool,
    /// Pools held in the local cache.
    pub cached_pools: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(cached_pools: usize) -> Self {
        Self {
            status: "ok".to_string(),
            storage: true,
            cached_pools,
        }
    }

    /// Create a health response indicating the remote store is offline.
    pub fn degraded(cached_pools: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            storage: false,
            cached_pools,
        }
    }
}

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::standings::{ScoringPolicy, StandingEntry};

/// Leaderboard of a pool.
#[derive(Debug, Serialize, ToSchema)]
pub struct StandingsResponse {
    pub pool_id: Uuid,
    pub scoring: ScoringPolicy,
    pub entries: Vec<StandingEntry>,
}

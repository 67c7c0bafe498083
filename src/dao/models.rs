use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::state::league::{League, Season};

/// Pool record as persisted by the storage layer and the offline snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolEntity {
    /// Primary key of the pool.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    pub description: Option<String>,
    /// User id of the creator.
    pub owner: String,
    pub league: League,
    pub season: Season,
    pub start_date: Date,
    pub end_date: Date,
    /// Owner first, then members in join order.
    pub participants: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last-writer-wins marker used when reconciling with the remote store.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// One stored prediction, keyed by (pool, match, user).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PredictionEntity {
    pub pool_id: Uuid,
    pub match_id: i64,
    pub user_id: String,
    pub home_goals: u8,
    pub away_goals: u8,
    /// Server timestamp in microseconds; the highest one wins.
    pub submitted_at: i64,
}

/// Outcome of a conditional prediction write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionWrite {
    /// The entry was inserted or replaced.
    Applied,
    /// A newer entry was already stored; nothing changed.
    Superseded,
}

/// Tournament of the companion catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TournamentEntity {
    pub id: Uuid,
    pub name: String,
    pub country: String,
    /// Free-form season label such as `2024/2025`.
    pub season: String,
    pub start_date: Date,
    pub end_date: Date,
}

/// Final result of a catalog match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchResultEntity {
    pub home_goals: u8,
    pub away_goals: u8,
}

/// Match of the companion catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogMatchEntity {
    pub id: Uuid,
    pub tournament_id: Uuid,
    pub home_team: String,
    pub away_team: String,
    #[serde(with = "time::serde::rfc3339")]
    pub match_date: OffsetDateTime,
    pub stadium: String,
    pub result: Option<MatchResultEntity>,
}

use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::{
    fixture::{MatchId, MatchStatus, Score},
    league::{League, Season},
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already encoded data field.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream.
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without its remote store.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a pool is created or its metadata or membership changed. Participants
/// fetch the details through the pool routes.
pub struct PoolChangedEvent {
    pub pool_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a pool was deleted along with its predictions.
pub struct PoolDeletedEvent {
    pub pool_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a prediction was stored. Neither the submitter nor the score is disclosed.
pub struct PredictionSubmittedEvent {
    pub pool_id: Uuid,
    pub match_id: MatchId,
    pub submitted_at: i64,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
/// Broadcast for every applied match transition.
pub struct MatchStatusEvent {
    pub match_id: MatchId,
    pub league: League,
    pub season: Season,
    pub from: MatchStatus,
    pub to: MatchStatus,
    pub score: Option<Score>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a match stops accepting predictions.
pub struct MatchLockedEvent {
    pub match_id: MatchId,
    pub status: MatchStatus,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when cached standings of a pool were dropped.
pub struct StandingsInvalidatedEvent {
    pub pool_id: Uuid,
    pub match_id: MatchId,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a provider update was refused by the lifecycle.
pub struct FixtureRejectedEvent {
    pub match_id: MatchId,
    pub league: League,
    pub season: Season,
    pub reason: String,
}

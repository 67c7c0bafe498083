use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::sse::{
        FixtureRejectedEvent, MatchLockedEvent, MatchStatusEvent, PoolChangedEvent,
        PoolDeletedEvent, PredictionSubmittedEvent, ServerEvent, StandingsInvalidatedEvent,
        SystemStatus,
    },
    state::{
        SseHub,
        fixture::{MatchId, Score},
        fixture_cache::RejectedUpdate,
        league::{League, Season},
        match_lifecycle::Transition,
        pool::PoolId,
        prediction::Prediction,
    },
};

pub const EVENT_POOL_CREATED: &str = "pool.created";
pub const EVENT_POOL_UPDATED: &str = "pool.updated";
pub const EVENT_POOL_DELETED: &str = "pool.deleted";
pub const EVENT_PREDICTION_SUBMITTED: &str = "prediction.submitted";
pub const EVENT_MATCH_STATUS: &str = "match.status";
pub const EVENT_MATCH_LOCKED: &str = "match.locked";
pub const EVENT_STANDINGS_INVALIDATED: &str = "standings.invalidated";
pub const EVENT_FIXTURE_REJECTED: &str = "fixture.rejected";
pub const EVENT_SYSTEM_DEGRADED: &str = "system.degraded";

/// Broadcast whether the backend runs without its remote store.
pub fn broadcast_system_status(hub: &SseHub, degraded: bool) {
    send_public_event(hub, EVENT_SYSTEM_DEGRADED, &SystemStatus { degraded });
}

/// Public payloads carry identifiers only; pool contents stay behind the participant routes.
pub fn broadcast_pool_created(hub: &SseHub, pool_id: PoolId) {
    send_public_event(hub, EVENT_POOL_CREATED, &PoolChangedEvent { pool_id });
}

/// Broadcast changed pool metadata or membership.
pub fn broadcast_pool_updated(hub: &SseHub, pool_id: PoolId) {
    send_public_event(hub, EVENT_POOL_UPDATED, &PoolChangedEvent { pool_id });
}

pub fn broadcast_pool_deleted(hub: &SseHub, pool_id: Uuid) {
    send_public_event(hub, EVENT_POOL_DELETED, &PoolDeletedEvent { pool_id });
}

pub fn broadcast_prediction_submitted(hub: &SseHub, prediction: &Prediction) {
    let payload = PredictionSubmittedEvent {
        pool_id: prediction.key.pool_id,
        match_id: prediction.key.match_id,
        submitted_at: prediction.submitted_at,
    };
    send_public_event(hub, EVENT_PREDICTION_SUBMITTED, &payload);
}

/// Broadcast one applied lifecycle step. `score` is the final score once finished.
pub fn broadcast_match_status(hub: &SseHub, transition: &Transition, score: Option<Score>) {
    let payload = MatchStatusEvent {
        match_id: transition.match_id,
        league: transition.league,
        season: transition.season,
        from: transition.from,
        to: transition.to,
        score,
    };
    send_public_event(hub, EVENT_MATCH_STATUS, &payload);
}

pub fn broadcast_match_locked(hub: &SseHub, transition: &Transition) {
    let payload = MatchLockedEvent {
        match_id: transition.match_id,
        status: transition.to,
    };
    send_public_event(hub, EVENT_MATCH_LOCKED, &payload);
}

pub fn broadcast_standings_invalidated(hub: &SseHub, pool_id: Uuid, match_id: MatchId) {
    let payload = StandingsInvalidatedEvent { pool_id, match_id };
    send_public_event(hub, EVENT_STANDINGS_INVALIDATED, &payload);
}

pub fn broadcast_fixture_rejected(
    hub: &SseHub,
    league: League,
    season: Season,
    rejected: &RejectedUpdate,
) {
    let payload = FixtureRejectedEvent {
        match_id: rejected.match_id,
        league,
        season,
        reason: rejected.reason.to_string(),
    };
    send_public_event(hub, EVENT_FIXTURE_REJECTED, &payload);
}

fn send_public_event(hub: &SseHub, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => hub.broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}

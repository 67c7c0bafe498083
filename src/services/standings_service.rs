//! Pool leaderboards and their invalidation when matches finish.

use std::{collections::HashMap, sync::Arc};

use tracing::{debug, info, warn};

use crate::{
    dto::standings::StandingsResponse,
    error::ServiceError,
    services::{pool_service, sse_events},
    state::{
        SharedState, SseHub,
        fixture::{MatchId, MatchStatus},
        match_lifecycle::{Transition, TransitionObserver},
        pool::{Pool, PoolId},
        prediction::Prediction,
        standings::{StandingsCache, compute_standings},
    },
};

/// Drops cached leaderboards of pools bound to a match's league and season once it finishes.
pub struct StandingsInvalidator {
    cache: Arc<StandingsCache>,
    hub: SseHub,
}

impl StandingsInvalidator {
    pub fn new(cache: Arc<StandingsCache>, hub: SseHub) -> Self {
        Self { cache, hub }
    }
}

impl TransitionObserver for StandingsInvalidator {
    fn interested(&self, _from: MatchStatus, to: MatchStatus) -> bool {
        to == MatchStatus::Finished
    }

    fn on_transition(&self, transition: &Transition) {
        let stale = self
            .cache
            .invalidate_bound_to(transition.league, transition.season);
        debug!(
            match_id = transition.match_id,
            pools = stale.len(),
            "standings invalidated"
        );
        for pool_id in stale {
            sse_events::broadcast_standings_invalidated(&self.hub, pool_id, transition.match_id);
        }
    }
}

/// Leaderboard of a pool. Participants only.
pub async fn standings(
    state: &SharedState,
    pool_id: PoolId,
    requester: &str,
) -> Result<StandingsResponse, ServiceError> {
    let (pool, _) = pool_service::load_pool_for(state, pool_id, requester).await?;
    let scoring = state.config().scoring();

    if let Some(entries) = state.standings().get(pool_id) {
        return Ok(StandingsResponse {
            pool_id,
            scoring,
            entries,
        });
    }

    let ticket = state.standings().ticket(pool_id, pool.league, pool.season);
    // participants are read again under the ticket
    let (pool, _) = pool_service::load_pool(state, pool_id).await?;
    let store = state.require_storage().await?;
    let predictions: Vec<Prediction> = store
        .list_predictions(pool_id)
        .await?
        .into_iter()
        .map(Prediction::from)
        .collect();

    ensure_fixtures_loaded(state, &pool).await;

    let predicted: Vec<MatchId> = {
        let mut ids: Vec<MatchId> = predictions.iter().map(|p| p.key.match_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    };
    let matches: HashMap<_, _> = state
        .lifecycle()
        .get_many(predicted.iter().copied())
        .await
        .into_iter()
        .map(|found| (found.id, found))
        .collect();

    let entries = compute_standings(&pool.participants, &predictions, &matches, scoring);
    if matches.len() == predicted.len() {
        let cached = state.standings().store(
            pool_id,
            pool.league,
            pool.season,
            ticket,
            entries.clone(),
        );
        if !cached {
            debug!(%pool_id, "standings not cached; invalidated while computing");
        }
    } else {
        debug!(
            %pool_id,
            unknown = predicted.len() - matches.len(),
            "standings not cached; some predicted matches are unknown"
        );
    }

    Ok(StandingsResponse {
        pool_id,
        scoring,
        entries,
    })
}

async fn ensure_fixtures_loaded(state: &SharedState, pool: &Pool) {
    if !state.fixtures().get(pool.league, pool.season).await.is_empty() {
        return;
    }
    match state
        .fixtures()
        .refresh(state.provider(), pool.league, pool.season)
        .await
    {
        Ok(report) => info!(
            league = %pool.league,
            season = %pool.season,
            matches = report.matches.len(),
            "fixtures loaded for standings"
        ),
        Err(err) => warn!(
            league = %pool.league,
            season = %pool.season,
            error = %err,
            "fixtures unavailable; standings use known matches only"
        ),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::{
        dto::{
            pool::{AddMemberRequest, CreatePoolRequest},
            prediction::SubmitPredictionRequest,
        },
        services::prediction_service::submit_prediction,
        state::{
            fixture::Score, league::League, match_lifecycle::tests::fixture, tests::memory_state,
        },
    };

    async fn pool(state: &SharedState) -> PoolId {
        let pool = pool_service::create_pool(
            state,
            "alice",
            CreatePoolRequest {
                name: "Familia".into(),
                description: None,
                league: League::PremierLeague,
                season: 2024,
                start_date: date!(2024 - 08 - 01),
                end_date: date!(2025 - 05 - 31),
            },
        )
        .await
        .unwrap();
        pool.id
    }

    async fn predict(
        state: &SharedState,
        pool_id: PoolId,
        match_id: MatchId,
        user: &str,
        home: i64,
        away: i64,
    ) {
        submit_prediction(
            state,
            pool_id,
            match_id,
            user,
            SubmitPredictionRequest {
                home_goals: home,
                away_goals: away,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn only_finished_matches_earn_points() {
        let (state, _store) = memory_state().await;
        let pool_id = pool(&state).await;
        state
            .lifecycle()
            .upsert(fixture(1, MatchStatus::Scheduled, None))
            .await;
        state
            .lifecycle()
            .upsert(fixture(2, MatchStatus::Scheduled, None))
            .await;
        predict(&state, pool_id, 1, "alice", 2, 1).await;
        predict(&state, pool_id, 2, "alice", 0, 0).await;
        state
            .lifecycle()
            .upsert(fixture(1, MatchStatus::Finished, Some(Score::new(2, 1))))
            .await;

        let table = standings(&state, pool_id, "alice").await.unwrap();
        assert_eq!(table.entries.len(), 1);
        assert_eq!(table.entries[0].points, 3);
        assert_eq!(table.entries[0].exact_hits, 1);
        assert_eq!(table.entries[0].matches_scored, 1);
    }

    #[tokio::test]
    async fn finishing_a_match_invalidates_cached_tables() {
        let (state, _store) = memory_state().await;
        let pool_id = pool(&state).await;
        pool_service::add_member(
            &state,
            pool_id,
            "alice",
            AddMemberRequest {
                user_id: "bob".into(),
            },
        )
        .await
        .unwrap();
        state
            .lifecycle()
            .upsert(fixture(1, MatchStatus::Scheduled, None))
            .await;
        predict(&state, pool_id, 1, "alice", 1, 0).await;
        predict(&state, pool_id, 1, "bob", 3, 0).await;

        let before = standings(&state, pool_id, "bob").await.unwrap();
        assert!(before.entries.iter().all(|row| row.points == 0));
        assert!(state.standings().get(pool_id).is_some());

        let mut events = state.public_sse().subscribe();
        state
            .lifecycle()
            .upsert(fixture(1, MatchStatus::Finished, Some(Score::new(3, 0))))
            .await;
        assert!(state.standings().get(pool_id).is_none());

        let mut names = Vec::new();
        while let Ok(event) = events.try_recv() {
            names.extend(event.event);
        }
        assert!(names.iter().any(|name| name == sse_events::EVENT_STANDINGS_INVALIDATED));

        let after = standings(&state, pool_id, "alice").await.unwrap();
        assert_eq!(after.entries[0].user_id, "bob");
        assert_eq!(after.entries[0].points, 3);
        assert_eq!(after.entries[1].points, 1);
    }

    #[tokio::test]
    async fn outsiders_cannot_read_standings() {
        let (state, _store) = memory_state().await;
        let pool_id = pool(&state).await;
        assert!(matches!(
            standings(&state, pool_id, "mallory").await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn match_finishing_mid_computation_is_not_cached_stale() {
        use std::time::Duration;
        use tokio::sync::oneshot;

        let (state, _store) = memory_state().await;
        let pool_id = pool(&state).await;
        state
            .lifecycle()
            .upsert(fixture(1, MatchStatus::Scheduled, None))
            .await;
        state
            .lifecycle()
            .upsert(fixture(2, MatchStatus::Scheduled, None))
            .await;
        predict(&state, pool_id, 1, "alice", 2, 1).await;
        predict(&state, pool_id, 2, "alice", 0, 0).await;

        // hold match 2 with a kickoff queued behind it so the computation stalls there
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let writer = {
            let state = state.clone();
            tokio::spawn(async move {
                state
                    .lifecycle()
                    .write_if_scheduled(2, move |_| async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Ok::<_, ServiceError>(())
                    })
                    .await
            })
        };
        started_rx.await.unwrap();
        let kickoff = {
            let state = state.clone();
            tokio::spawn(async move {
                state
                    .lifecycle()
                    .upsert(fixture(2, MatchStatus::Live, None))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let reader = {
            let state = state.clone();
            tokio::spawn(async move { standings(&state, pool_id, "alice").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        state
            .lifecycle()
            .upsert(fixture(1, MatchStatus::Finished, Some(Score::new(2, 1))))
            .await;
        release_tx.send(()).unwrap();
        writer.await.unwrap().unwrap();
        kickoff.await.unwrap();
        reader.await.unwrap().unwrap();

        let later = standings(&state, pool_id, "alice").await.unwrap();
        assert_eq!(later.entries[0].points, 3);
    }
}

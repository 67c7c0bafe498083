//! Prediction ledger operations and the lock notifier subscribed to the match lifecycle.

use tracing::{debug, info};

use crate::{
    dao::models::{PredictionEntity, PredictionWrite},
    dto::prediction::{PredictionResponse, SubmissionResponse, SubmitPredictionRequest},
    error::ServiceError,
    services::{pool_service, sse_events},
    state::{
        SharedState, SseHub,
        fixture::{MatchId, MatchStatus},
        match_lifecycle::{Transition, TransitionObserver},
        pool::PoolId,
        prediction::{Prediction, PredictionKey, predicted_score},
    },
};

/// Announces `match.locked` when a scheduled match leaves the open state.
pub struct LockNotifier {
    hub: SseHub,
}

impl LockNotifier {
    pub fn new(hub: SseHub) -> Self {
        Self { hub }
    }
}

impl TransitionObserver for LockNotifier {
    fn interested(&self, from: MatchStatus, to: MatchStatus) -> bool {
        from == MatchStatus::Scheduled && to.is_locked()
    }

    fn on_transition(&self, transition: &Transition) {
        info!(
            match_id = transition.match_id,
            status = %transition.to,
            "predictions locked"
        );
        sse_events::broadcast_match_locked(&self.hub, transition);
    }
}

/// Store the caller's prediction for a match of the pool while the match is still scheduled.
///
/// The status check and the store write run under the match's read guard, so a concurrent
/// kickoff either waits for this write or is observed by it.
pub async fn submit_prediction(
    state: &SharedState,
    pool_id: PoolId,
    match_id: MatchId,
    user_id: &str,
    request: SubmitPredictionRequest,
) -> Result<SubmissionResponse, ServiceError> {
    let score = predicted_score(request.home_goals, request.away_goals)?;
    let (pool, _) = pool_service::load_pool_for(state, pool_id, user_id).await?;

    let fixture = state
        .lifecycle()
        .get(match_id)
        .await
        .ok_or_else(|| ServiceError::NotFound(format!("match `{match_id}` not found")))?;
    if fixture.league != pool.league || fixture.season != pool.season {
        return Err(ServiceError::InvalidInput(format!(
            "match `{match_id}` is not part of {} {}",
            pool.league, pool.season
        )));
    }

    let store = state.require_storage().await?;
    let key = PredictionKey {
        pool_id,
        match_id,
        user_id: user_id.to_owned(),
    };
    let member = user_id.to_owned();
    let (prediction, write) = state
        .lifecycle()
        .write_if_scheduled(match_id, |_| async move {
            let prediction = Prediction {
                key,
                score,
                submitted_at: state.clock().next(),
            };
            let write = store
                .upsert_prediction(PredictionEntity::from(prediction.clone()))
                .await?;
            // a removal or pool deletion may have committed while the write was in flight
            if !pool_service::is_remote_participant(&store, pool_id, &member).await? {
                store.delete_user_predictions(pool_id, member.clone()).await?;
                return Err(ServiceError::Forbidden(format!(
                    "user `{member}` is no longer a participant of pool `{pool_id}`"
                )));
            }
            Ok((prediction, write))
        })
        .await?;

    let applied = write == PredictionWrite::Applied;
    if applied {
        debug!(%pool_id, match_id, user_id, "prediction stored");
        sse_events::broadcast_prediction_submitted(state.public_sse(), &prediction);
    } else {
        debug!(%pool_id, match_id, user_id, "prediction superseded by a newer write");
    }

    Ok(SubmissionResponse {
        applied,
        prediction: prediction.into(),
    })
}

/// Every prediction of the pool. Participants only.
pub async fn list_for_pool(
    state: &SharedState,
    pool_id: PoolId,
    requester: &str,
) -> Result<Vec<PredictionResponse>, ServiceError> {
    pool_service::load_pool_for(state, pool_id, requester).await?;
    let store = state.require_storage().await?;
    let predictions = store.list_predictions(pool_id).await?;
    Ok(predictions
        .into_iter()
        .map(|entity| Prediction::from(entity).into())
        .collect())
}

/// Predictions of one participant in the pool. Participants only.
pub async fn list_for_user(
    state: &SharedState,
    pool_id: PoolId,
    requester: &str,
    user_id: &str,
) -> Result<Vec<PredictionResponse>, ServiceError> {
    pool_service::load_pool_for(state, pool_id, requester).await?;
    let store = state.require_storage().await?;
    let predictions = store
        .list_user_predictions(pool_id, user_id.to_owned())
        .await?;
    Ok(predictions
        .into_iter()
        .map(|entity| Prediction::from(entity).into())
        .collect())
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::{
        dto::pool::{AddMemberRequest, CreatePoolRequest},
        state::{
            fixture::Score,
            league::{League, Season},
            match_lifecycle::tests::fixture,
            tests::memory_state,
        },
    };

    async fn pool_with_members(state: &SharedState) -> PoolId {
        let pool = pool_service::create_pool(
            state,
            "alice",
            CreatePoolRequest {
                name: "Oficina".into(),
                description: None,
                league: League::PremierLeague,
                season: 2024,
                start_date: date!(2024 - 08 - 01),
                end_date: date!(2025 - 05 - 31),
            },
        )
        .await
        .unwrap();
        pool_service::add_member(
            state,
            pool.id,
            "alice",
            AddMemberRequest {
                user_id: "bob".into(),
            },
        )
        .await
        .unwrap();
        pool.id
    }

    fn goals(home: i64, away: i64) -> SubmitPredictionRequest {
        SubmitPredictionRequest {
            home_goals: home,
            away_goals: away,
        }
    }

    #[tokio::test]
    async fn resubmission_overwrites_the_same_entry() {
        let (state, _store) = memory_state().await;
        let pool_id = pool_with_members(&state).await;
        state
            .lifecycle()
            .upsert(fixture(1, MatchStatus::Scheduled, None))
            .await;

        let first = submit_prediction(&state, pool_id, 1, "alice", goals(1, 0))
            .await
            .unwrap();
        let second = submit_prediction(&state, pool_id, 1, "alice", goals(1, 0))
            .await
            .unwrap();
        assert!(first.applied && second.applied);
        assert!(second.prediction.submitted_at > first.prediction.submitted_at);

        let stored = list_for_pool(&state, pool_id, "alice").await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn two_users_on_the_same_match_both_persist() {
        let (state, _store) = memory_state().await;
        let pool_id = pool_with_members(&state).await;
        state
            .lifecycle()
            .upsert(fixture(1, MatchStatus::Scheduled, None))
            .await;

        submit_prediction(&state, pool_id, 1, "alice", goals(2, 1))
            .await
            .unwrap();
        submit_prediction(&state, pool_id, 1, "bob", goals(0, 0))
            .await
            .unwrap();

        assert_eq!(list_for_pool(&state, pool_id, "bob").await.unwrap().len(), 2);
        let bobs = list_for_user(&state, pool_id, "alice", "bob").await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!((bobs[0].home_goals, bobs[0].away_goals), (0, 0));
    }

    #[tokio::test]
    async fn locked_matches_refuse_predictions() {
        let (state, _store) = memory_state().await;
        let pool_id = pool_with_members(&state).await;
        state
            .lifecycle()
            .upsert(fixture(1, MatchStatus::Scheduled, None))
            .await;
        submit_prediction(&state, pool_id, 1, "alice", goals(2, 1))
            .await
            .unwrap();

        state
            .lifecycle()
            .upsert(fixture(1, MatchStatus::Live, None))
            .await;
        let err = submit_prediction(&state, pool_id, 1, "alice", goals(5, 5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Locked {
                match_id: 1,
                status: MatchStatus::Live
            }
        ));

        state
            .lifecycle()
            .upsert(fixture(2, MatchStatus::Finished, Some(Score::new(0, 1))))
            .await;
        assert!(matches!(
            submit_prediction(&state, pool_id, 2, "bob", goals(0, 1)).await,
            Err(ServiceError::Locked { .. })
        ));

        let stored = list_for_pool(&state, pool_id, "alice").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!((stored[0].home_goals, stored[0].away_goals), (2, 1));
    }

    #[tokio::test]
    async fn submissions_are_validated() {
        let (state, _store) = memory_state().await;
        let pool_id = pool_with_members(&state).await;
        state
            .lifecycle()
            .upsert(fixture(1, MatchStatus::Scheduled, None))
            .await;
        let mut other_league = fixture(2, MatchStatus::Scheduled, None);
        other_league.league = League::SerieA;
        other_league.season = Season::new(2024).unwrap();
        state.lifecycle().upsert(other_league).await;

        assert!(matches!(
            submit_prediction(&state, pool_id, 1, "alice", goals(-1, 0)).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            submit_prediction(&state, pool_id, 1, "mallory", goals(1, 0)).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            submit_prediction(&state, pool_id, 2, "alice", goals(1, 0)).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            submit_prediction(&state, pool_id, 99, "alice", goals(1, 0)).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn kickoff_broadcasts_lock() {
        let (state, _store) = memory_state().await;
        let mut events = state.public_sse().subscribe();
        state
            .lifecycle()
            .upsert(fixture(1, MatchStatus::Scheduled, None))
            .await;
        state
            .lifecycle()
            .upsert(fixture(1, MatchStatus::Live, None))
            .await;

        let event = events.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some(sse_events::EVENT_MATCH_LOCKED));
    }

    #[tokio::test]
    async fn deleting_the_pool_cascades_predictions() {
        let (state, _store) = memory_state().await;
        let pool_id = pool_with_members(&state).await;
        state
            .lifecycle()
            .upsert(fixture(1, MatchStatus::Scheduled, None))
            .await;
        submit_prediction(&state, pool_id, 1, "bob", goals(1, 1))
            .await
            .unwrap();

        let store = state.require_storage().await.unwrap();
        pool_service::delete_pool(&state, pool_id, "alice")
            .await
            .unwrap();
        assert!(store.list_predictions(pool_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn removing_a_member_cascades_their_predictions() {
        let (state, _store) = memory_state().await;
        let pool_id = pool_with_members(&state).await;
        state
            .lifecycle()
            .upsert(fixture(1, MatchStatus::Scheduled, None))
            .await;
        submit_prediction(&state, pool_id, 1, "alice", goals(1, 0))
            .await
            .unwrap();
        submit_prediction(&state, pool_id, 1, "bob", goals(1, 1))
            .await
            .unwrap();

        pool_service::remove_member(&state, pool_id, "alice", "bob")
            .await
            .unwrap();
        let left = list_for_pool(&state, pool_id, "alice").await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].user_id, "alice");
    }

    #[tokio::test]
    async fn failed_cascade_keeps_the_participant() {
        let (state, store) = memory_state().await;
        let pool_id = pool_with_members(&state).await;
        state
            .lifecycle()
            .upsert(fixture(1, MatchStatus::Scheduled, None))
            .await;
        submit_prediction(&state, pool_id, 1, "bob", goals(1, 1))
            .await
            .unwrap();

        store.fail_prediction_deletes(true);
        assert!(matches!(
            pool_service::remove_member(&state, pool_id, "alice", "bob").await,
            Err(ServiceError::Unavailable(_))
        ));
        store.fail_prediction_deletes(false);

        assert!(pool_service::get_pool(&state, pool_id, "bob").await.is_ok());
        assert_eq!(list_for_user(&state, pool_id, "alice", "bob").await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn write_in_flight_during_removal_is_dropped() {
        use std::time::Duration;

        let (state, store) = memory_state().await;
        let pool_id = pool_with_members(&state).await;
        state
            .lifecycle()
            .upsert(fixture(1, MatchStatus::Scheduled, None))
            .await;

        let gate = store.hold_prediction_writes();
        let submission = {
            let state = state.clone();
            tokio::spawn(async move {
                submit_prediction(&state, pool_id, 1, "bob", goals(2, 2)).await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        pool_service::remove_member(&state, pool_id, "alice", "bob")
            .await
            .unwrap();
        gate.add_permits(1);

        assert!(matches!(
            submission.await.unwrap(),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(list_for_pool(&state, pool_id, "alice").await.unwrap().is_empty());
    }
}

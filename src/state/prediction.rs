//! Score predictions and the server clock that orders them.

use std::sync::atomic::{AtomicI64, Ordering};

use thiserror::Error;
use time::OffsetDateTime;

use crate::{
    dao::models::PredictionEntity,
    state::{
        fixture::{MatchId, Score},
        pool::{PoolId, UserId},
    },
};

/// Highest goal count accepted in a prediction.
pub const MAX_GOALS: i64 = 99;

/// Identity of a prediction: one per participant, match and pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PredictionKey {
    pub pool_id: PoolId,
    pub match_id: MatchId,
    pub user_id: UserId,
}

/// A participant's guessed final score for one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub key: PredictionKey,
    pub score: Score,
    /// Server-assigned microseconds since the Unix epoch.
    pub submitted_at: i64,
}

/// Raised when predicted goals fall outside `0..=MAX_GOALS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("predicted goals must be between 0 and {MAX_GOALS}, got {home}-{away}")]
pub struct InvalidGoals {
    pub home: i64,
    pub away: i64,
}

/// Turn raw client input into a score.
pub fn predicted_score(home: i64, away: i64) -> Result<Score, InvalidGoals> {
    let bounded = |goals: i64| u8::try_from(goals).ok().filter(|g| i64::from(*g) <= MAX_GOALS);
    match (bounded(home), bounded(away)) {
        (Some(h), Some(a)) => Ok(Score::new(h, a)),
        _ => Err(InvalidGoals { home, away }),
    }
}

/// Monotonic source of submission timestamps.
///
/// Two calls never return the same value even when the wall clock stalls or steps back.
#[derive(Debug, Default)]
pub struct SubmissionClock {
    last: AtomicI64,
}

impl SubmissionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next timestamp, in microseconds.
    pub fn next(&self) -> i64 {
        let wall = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000) as i64;
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = wall.max(previous + 1);
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(current) => previous = current,
            }
        }
    }
}

impl From<PredictionEntity> for Prediction {
    fn from(entity: PredictionEntity) -> Self {
        Self {
            key: PredictionKey {
                pool_id: entity.pool_id,
                match_id: entity.match_id,
                user_id: entity.user_id,
            },
            score: Score::new(entity.home_goals, entity.away_goals),
            submitted_at: entity.submitted_at,
        }
    }
}

impl From<Prediction> for PredictionEntity {
    fn from(prediction: Prediction) -> Self {
        Self {
            pool_id: prediction.key.pool_id,
            match_id: prediction.key.match_id,
            user_id: prediction.key.user_id,
            home_goals: prediction.score.home,
            away_goals: prediction.score.away,
            submitted_at: prediction.submitted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc};

    use super::*;

    #[test]
    fn goals_are_bounded() {
        assert_eq!(predicted_score(0, 99), Ok(Score::new(0, 99)));
        assert!(predicted_score(-1, 0).is_err());
        assert!(predicted_score(2, 100).is_err());
        assert!(predicted_score(300, 1).is_err());
    }

    #[test]
    fn clock_is_strictly_increasing() {
        let clock = SubmissionClock::new();
        let mut last = clock.next();
        for _ in 0..1_000 {
            let next = clock.next();
            assert!(next > last);
            last = next;
        }
    }

    #[test]
    fn clock_never_repeats_across_threads() {
        let clock = Arc::new(SubmissionClock::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = clock.clone();
                std::thread::spawn(move || (0..500).map(|_| clock.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for stamp in handle.join().unwrap() {
                assert!(seen.insert(stamp));
            }
        }
    }
}

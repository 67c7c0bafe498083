//! Leaderboard computation and the per-pool standings cache.

use std::collections::HashMap;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::{
    fixture::{Match, MatchId, MatchStatus},
    league::{League, Season},
    pool::{PoolId, UserId},
    prediction::Prediction,
};

/// Points awarded per prediction on a finished match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScoringPolicy {
    /// Exact final score.
    pub exact: u32,
    /// Right winner or draw, wrong score.
    pub outcome: u32,
    pub miss: u32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            exact: 3,
            outcome: 1,
            miss: 0,
        }
    }
}

/// One participant's row in a pool leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StandingEntry {
    /// 1-based rank.
    pub position: usize,
    pub user_id: UserId,
    pub points: u32,
    pub exact_hits: u32,
    pub outcome_hits: u32,
    /// Predictions on finished matches.
    pub matches_scored: u32,
}

/// Rank `participants` by points from their predictions on finished `matches`.
///
/// Ties keep join order. Predictions from non-participants and on matches that are not
/// finished are ignored.
pub fn compute_standings(
    participants: &[UserId],
    predictions: &[Prediction],
    matches: &HashMap<MatchId, Match>,
    policy: ScoringPolicy,
) -> Vec<StandingEntry> {
    let mut rows: Vec<StandingEntry> = participants
        .iter()
        .map(|user_id| StandingEntry {
            position: 0,
            user_id: user_id.clone(),
            points: 0,
            exact_hits: 0,
            outcome_hits: 0,
            matches_scored: 0,
        })
        .collect();
    let index: HashMap<&str, usize> = participants
        .iter()
        .enumerate()
        .map(|(idx, user)| (user.as_str(), idx))
        .collect();

    for prediction in predictions {
        let Some(&row) = index.get(prediction.key.user_id.as_str()) else {
            continue;
        };
        let Some(fixture) = matches.get(&prediction.key.match_id) else {
            continue;
        };
        let (MatchStatus::Finished, Some(actual)) = (fixture.status, fixture.score) else {
            continue;
        };

        let entry = &mut rows[row];
        entry.matches_scored += 1;
        if prediction.score == actual {
            entry.exact_hits += 1;
            entry.points += policy.exact;
        } else if prediction.score.outcome() == actual.outcome() {
            entry.outcome_hits += 1;
            entry.points += policy.outcome;
        } else {
            entry.points += policy.miss;
        }
    }

    rows.sort_by(|a, b| b.points.cmp(&a.points));
    for (idx, row) in rows.iter_mut().enumerate() {
        row.position = idx + 1;
    }
    rows
}

struct CachedStandings {
    league: League,
    season: Season,
    entries: Vec<StandingEntry>,
}

/// Invalidation generations observed before a leaderboard is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandingsTicket {
    season_generation: u64,
    pool_generation: u64,
}

/// Computed leaderboards keyed by pool.
///
/// Every invalidation bumps a generation. A leaderboard computed under an older ticket is
/// never cached, so a match finishing mid-computation cannot leave a stale table behind.
#[derive(Default)]
pub struct StandingsCache {
    entries: DashMap<PoolId, CachedStandings>,
    season_generations: DashMap<(League, Season), u64>,
    pool_generations: DashMap<PoolId, u64>,
}

impl StandingsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pool_id: PoolId) -> Option<Vec<StandingEntry>> {
        self.entries.get(&pool_id).map(|cached| cached.entries.clone())
    }

    /// Take before reading predictions and match states.
    pub fn ticket(&self, pool_id: PoolId, league: League, season: Season) -> StandingsTicket {
        StandingsTicket {
            season_generation: self
                .season_generations
                .get(&(league, season))
                .map_or(0, |generation| *generation),
            pool_generation: self
                .pool_generations
                .get(&pool_id)
                .map_or(0, |generation| *generation),
        }
    }

    /// Cache `entries` unless an invalidation ran since `ticket` was taken.
    pub fn store(
        &self,
        pool_id: PoolId,
        league: League,
        season: Season,
        ticket: StandingsTicket,
        entries: Vec<StandingEntry>,
    ) -> bool {
        // both guards stay held across the insert so an invalidation cannot interleave
        let season_generation = self.season_generations.entry((league, season)).or_insert(0);
        let pool_generation = self.pool_generations.entry(pool_id).or_insert(0);
        if *season_generation != ticket.season_generation
            || *pool_generation != ticket.pool_generation
        {
            return false;
        }
        self.entries.insert(
            pool_id,
            CachedStandings {
                league,
                season,
                entries,
            },
        );
        true
    }

    /// Drop the cached leaderboard of one pool.
    pub fn invalidate_pool(&self, pool_id: PoolId) -> bool {
        let mut generation = self.pool_generations.entry(pool_id).or_insert(0);
        *generation += 1;
        self.entries.remove(&pool_id).is_some()
    }

    /// Drop every cached leaderboard of pools bound to `league` and `season`.
    pub fn invalidate_bound_to(&self, league: League, season: Season) -> Vec<PoolId> {
        let mut generation = self.season_generations.entry((league, season)).or_insert(0);
        *generation += 1;
        let stale: Vec<PoolId> = self
            .entries
            .iter()
            .filter(|entry| entry.league == league && entry.season == season)
            .map(|entry| *entry.key())
            .collect();
        for pool_id in &stale {
            self.entries.remove(pool_id);
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::state::{
        fixture::Score, match_lifecycle::tests::fixture, prediction::PredictionKey,
    };

    fn prediction(pool_id: PoolId, match_id: MatchId, user: &str, home: u8, away: u8) -> Prediction {
        Prediction {
            key: PredictionKey {
                pool_id,
                match_id,
                user_id: user.into(),
            },
            score: Score::new(home, away),
            submitted_at: 1,
        }
    }

    fn by_id(matches: Vec<Match>) -> HashMap<MatchId, Match> {
        matches.into_iter().map(|m| (m.id, m)).collect()
    }

    #[test]
    fn only_finished_matches_score() {
        let pool_id = Uuid::new_v4();
        let matches = by_id(vec![
            fixture(1, MatchStatus::Finished, Some(Score::new(2, 1))),
            fixture(2, MatchStatus::Scheduled, None),
        ]);
        let predictions = vec![
            prediction(pool_id, 1, "alice", 2, 1),
            prediction(pool_id, 2, "alice", 0, 0),
        ];

        let table = compute_standings(
            &["alice".to_string()],
            &predictions,
            &matches,
            ScoringPolicy::default(),
        );
        assert_eq!(
            table,
            vec![StandingEntry {
                position: 1,
                user_id: "alice".into(),
                points: 3,
                exact_hits: 1,
                outcome_hits: 0,
                matches_scored: 1,
            }]
        );
    }

    #[test]
    fn outcome_hits_and_tie_order() {
        let pool_id = Uuid::new_v4();
        let matches = by_id(vec![fixture(1, MatchStatus::Finished, Some(Score::new(3, 0)))]);
        let predictions = vec![
            prediction(pool_id, 1, "carol", 1, 0),
            prediction(pool_id, 1, "bob", 1, 0),
            prediction(pool_id, 1, "alice", 0, 2),
            prediction(pool_id, 1, "mallory", 3, 0),
        ];
        let members: Vec<UserId> = ["alice", "bob", "carol"].map(String::from).to_vec();

        let table = compute_standings(&members, &predictions, &matches, ScoringPolicy::default());
        let order: Vec<_> = table.iter().map(|row| row.user_id.as_str()).collect();
        assert_eq!(order, vec!["bob", "carol", "alice"]);
        assert_eq!(table[0].outcome_hits, 1);
        assert_eq!(table[2].points, 0);
        assert_eq!(table[2].matches_scored, 1);
        assert_eq!(table[2].position, 3);
    }

    #[test]
    fn policy_is_configurable() {
        let pool_id = Uuid::new_v4();
        let matches = by_id(vec![fixture(1, MatchStatus::Finished, Some(Score::new(1, 1)))]);
        let policy = ScoringPolicy {
            exact: 5,
            outcome: 2,
            miss: 0,
        };
        let table = compute_standings(
            &["alice".to_string()],
            &[prediction(pool_id, 1, "alice", 2, 2)],
            &matches,
            policy,
        );
        assert_eq!(table[0].points, 2);
    }

    #[test]
    fn cache_invalidates_by_binding() {
        let cache = StandingsCache::new();
        let season = Season::new(2024).unwrap();
        let premier = Uuid::new_v4();
        let serie_a = Uuid::new_v4();
        let ticket = cache.ticket(premier, League::PremierLeague, season);
        assert!(cache.store(premier, League::PremierLeague, season, ticket, Vec::new()));
        let ticket = cache.ticket(serie_a, League::SerieA, season);
        assert!(cache.store(serie_a, League::SerieA, season, ticket, Vec::new()));

        assert_eq!(cache.invalidate_bound_to(League::PremierLeague, season), vec![premier]);
        assert!(cache.get(premier).is_none());
        assert!(cache.get(serie_a).is_some());
    }

    #[test]
    fn tables_computed_before_an_invalidation_are_not_cached() {
        let cache = StandingsCache::new();
        let season = Season::new(2024).unwrap();
        let pool_id = Uuid::new_v4();

        let ticket = cache.ticket(pool_id, League::LaLiga, season);
        cache.invalidate_bound_to(League::LaLiga, season);
        assert!(!cache.store(pool_id, League::LaLiga, season, ticket, Vec::new()));
        assert!(cache.get(pool_id).is_none());

        let ticket = cache.ticket(pool_id, League::LaLiga, season);
        cache.invalidate_pool(pool_id);
        assert!(!cache.store(pool_id, League::LaLiga, season, ticket, Vec::new()));

        let ticket = cache.ticket(pool_id, League::LaLiga, season);
        cache.invalidate_bound_to(League::SerieA, season);
        assert!(cache.store(pool_id, League::LaLiga, season, ticket, Vec::new()));
        assert!(cache.get(pool_id).is_some());
    }
}

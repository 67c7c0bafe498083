use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexSet;
use tracing::{info, warn};

use crate::{
    dao::fixtures::{FetchError, FixtureProvider},
    state::{
        fixture::{Match, MatchId},
        league::{League, LeagueTable, Season},
        match_lifecycle::{MatchLifecycle, Transition, TransitionError, UpsertOutcome},
    },
};

/// Reported update the cache refused to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedUpdate {
    pub match_id: MatchId,
    pub reason: TransitionError,
}

/// Summary of one merge of provider data into the cache.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub league: League,
    pub season: Season,
    /// Cached fixtures after the merge.
    pub matches: Vec<Match>,
    pub inserted: usize,
    pub transitions: Vec<Transition>,
    pub rejected: Vec<RejectedUpdate>,
}

/// Fixtures per league and season, backed by the shared [`MatchLifecycle`] registry.
pub struct FixtureCache {
    lifecycle: Arc<MatchLifecycle>,
    leagues: LeagueTable,
    index: DashMap<(League, Season), IndexSet<MatchId>>,
}

impl FixtureCache {
    pub fn new(lifecycle: Arc<MatchLifecycle>, leagues: LeagueTable) -> Self {
        Self {
            lifecycle,
            leagues,
            index: DashMap::new(),
        }
    }

    /// League mapping table the cache resolves pools against.
    pub fn leagues(&self) -> &LeagueTable {
        &self.leagues
    }

    /// Whether fixtures for `league` can be resolved at all.
    pub fn knows(&self, league: League) -> bool {
        self.leagues.contains(league)
    }

    /// Cached fixtures, ordered by kickoff then id. Never touches the network.
    pub async fn get(&self, league: League, season: Season) -> Vec<Match> {
        let ids: Vec<MatchId> = self
            .index
            .get(&(league, season))
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();

        let mut matches = self.lifecycle.get_many(ids).await;
        matches.sort_by(|a, b| a.kickoff.cmp(&b.kickoff).then(a.id.cmp(&b.id)));
        matches
    }

    /// Fetch fixtures from `provider` and merge them. The cache is left untouched on error.
    pub async fn refresh(
        &self,
        provider: &dyn FixtureProvider,
        league: League,
        season: Season,
    ) -> Result<RefreshReport, FetchError> {
        let info = self
            .leagues
            .get(league)
            .cloned()
            .ok_or(FetchError::UnknownLeague(league))?;
        let reported = provider.fetch_matches(&info, season).await?;
        Ok(self.merge(league, season, reported).await)
    }

    /// Upsert reported fixtures by id, rejecting status regressions.
    pub async fn merge(&self, league: League, season: Season, reported: Vec<Match>) -> RefreshReport {
        let mut inserted = 0;
        let mut transitions = Vec::new();
        let mut rejected = Vec::new();
        let mut known = Vec::with_capacity(reported.len());

        for fixture in reported {
            let match_id = fixture.id;
            match self.lifecycle.upsert(fixture).await {
                UpsertOutcome::Inserted => {
                    inserted += 1;
                    known.push(match_id);
                }
                UpsertOutcome::Unchanged | UpsertOutcome::Refreshed => known.push(match_id),
                UpsertOutcome::Advanced(steps) => {
                    transitions.extend(steps);
                    known.push(match_id);
                }
                UpsertOutcome::Rejected(reason) => {
                    warn!(
                        match_id,
                        %league,
                        %season,
                        reason = %reason,
                        "rejected fixture update"
                    );
                    rejected.push(RejectedUpdate { match_id, reason });
                }
            }
        }

        self.index
            .entry((league, season))
            .or_default()
            .extend(known);

        info!(
            %league,
            %season,
            inserted,
            transitions = transitions.len(),
            rejected = rejected.len(),
            "fixtures merged"
        );

        RefreshReport {
            league,
            season,
            matches: self.get(league, season).await,
            inserted,
            transitions,
            rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;
    use time::macros::datetime;

    use super::*;
    use crate::state::{
        fixture::{MatchStatus, Score},
        league::LeagueInfo,
        match_lifecycle::tests::fixture,
    };

    fn cache() -> FixtureCache {
        FixtureCache::new(
            Arc::new(MatchLifecycle::new(Vec::new())),
            LeagueTable::default(),
        )
    }

    fn season() -> Season {
        Season::new(2024).unwrap()
    }

    struct Unreachable;

    impl FixtureProvider for Unreachable {
        fn fetch_matches(
            &self,
            _league: &LeagueInfo,
            _season: Season,
        ) -> BoxFuture<'static, Result<Vec<Match>, FetchError>> {
            Box::pin(async { Err(FetchError::Timeout) })
        }
    }

    #[tokio::test]
    async fn regression_is_rejected_and_reported() {
        let cache = cache();
        cache
            .merge(
                League::PremierLeague,
                season(),
                vec![fixture(1, MatchStatus::Finished, Some(Score::new(2, 1)))],
            )
            .await;

        let report = cache
            .merge(
                League::PremierLeague,
                season(),
                vec![fixture(1, MatchStatus::Scheduled, None)],
            )
            .await;

        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].match_id, 1);
        assert_eq!(report.matches[0].status, MatchStatus::Finished);
        assert_eq!(report.matches[0].score, Some(Score::new(2, 1)));
    }

    #[tokio::test]
    async fn get_orders_by_kickoff() {
        let cache = cache();
        let mut late = fixture(2, MatchStatus::Scheduled, None);
        late.kickoff = datetime!(2024-11-01 20:00 UTC);
        let early = fixture(5, MatchStatus::Scheduled, None);

        let report = cache
            .merge(League::PremierLeague, season(), vec![late, early])
            .await;
        assert_eq!(report.inserted, 2);

        let ids: Vec<_> = cache
            .get(League::PremierLeague, season())
            .await
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![5, 2]);
        assert!(cache.get(League::SerieA, season()).await.is_empty());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_last_known_fixtures() {
        let cache = cache();
        cache
            .merge(
                League::PremierLeague,
                season(),
                vec![fixture(1, MatchStatus::Scheduled, None)],
            )
            .await;

        let err = cache
            .refresh(&Unreachable, League::PremierLeague, season())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout));
        assert_eq!(cache.get(League::PremierLeague, season()).await.len(), 1);
    }

    #[tokio::test]
    async fn advancing_statuses_are_collected() {
        let cache = cache();
        cache
            .merge(
                League::PremierLeague,
                season(),
                vec![fixture(1, MatchStatus::Scheduled, None)],
            )
            .await;
        let report = cache
            .merge(
                League::PremierLeague,
                season(),
                vec![fixture(1, MatchStatus::Live, None)],
            )
            .await;
        assert_eq!(report.transitions.len(), 1);
        assert_eq!(report.transitions[0].to, MatchStatus::Live);
    }
}

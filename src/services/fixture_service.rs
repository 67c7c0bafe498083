//! Fixture reads, provider refreshes and the background refresher.

use std::collections::{BTreeMap, BTreeSet};

use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::{
    dao::fixtures::FetchError,
    dto::fixture::{FixturesResponse, MatchDayResponse, MatchResponse, PoolMatchesResponse},
    error::ServiceError,
    services::{pool_service, sse_events},
    state::{
        SharedState,
        fixture::{MatchStatus, Score},
        fixture_cache::RefreshReport,
        league::{League, LeagueInfo, Season},
        pool::PoolId,
    },
};

/// Leagues the server can bind pools to.
pub fn list_leagues(state: &SharedState) -> Vec<LeagueInfo> {
    state.fixtures().leagues().iter().cloned().collect()
}

/// Fetch fixtures from the provider, merge them and broadcast what changed.
pub async fn refresh_league(
    state: &SharedState,
    league: League,
    season: Season,
) -> Result<RefreshReport, FetchError> {
    let report = state
        .fixtures()
        .refresh(state.provider(), league, season)
        .await?;

    for transition in &report.transitions {
        let score = if transition.to == MatchStatus::Finished {
            final_score(state, transition.match_id).await
        } else {
            None
        };
        sse_events::broadcast_match_status(state.public_sse(), transition, score);
    }
    for rejected in &report.rejected {
        sse_events::broadcast_fixture_rejected(state.public_sse(), league, season, rejected);
    }
    Ok(report)
}

async fn final_score(state: &SharedState, match_id: i64) -> Option<Score> {
    state.lifecycle().get(match_id).await.and_then(|m| m.score)
}

/// Cached fixtures of a league and season.
///
/// A refresh is attempted when `refresh` is set or nothing is cached yet. When the provider
/// fails, cached data is served with a notice; the error surfaces only if the cache is empty.
pub async fn fixtures(
    state: &SharedState,
    league: League,
    season: Season,
    refresh: bool,
) -> Result<FixturesResponse, ServiceError> {
    if !state.fixtures().knows(league) {
        return Err(ServiceError::NotFound(format!(
            "league `{league}` is not available"
        )));
    }

    let cached = state.fixtures().get(league, season).await;
    let (matches, notice) = if refresh || cached.is_empty() {
        match refresh_league(state, league, season).await {
            Ok(report) => (report.matches, None),
            Err(err) if cached.is_empty() => return Err(err.into()),
            Err(err) => {
                warn!(%league, %season, error = %err, "serving cached fixtures");
                (cached, Some(format!("showing cached fixtures: {err}")))
            }
        }
    } else {
        (cached, None)
    };

    Ok(FixturesResponse {
        league,
        season,
        matches: matches.into_iter().map(MatchResponse::from).collect(),
        notice,
    })
}

/// Matches of a pool within its date window, grouped by kickoff date.
pub async fn pool_matches(
    state: &SharedState,
    pool_id: PoolId,
    requester: &str,
    status: Option<MatchStatus>,
) -> Result<PoolMatchesResponse, ServiceError> {
    let (pool, _) = pool_service::load_pool_for(state, pool_id, requester).await?;

    let mut matches = state.fixtures().get(pool.league, pool.season).await;
    let mut notice = None;
    if matches.is_empty() {
        match refresh_league(state, pool.league, pool.season).await {
            Ok(report) => matches = report.matches,
            Err(err) => {
                warn!(%pool_id, error = %err, "fixtures unavailable for pool");
                notice = Some(format!("fixtures unavailable: {err}"));
            }
        }
    }

    let mut days: BTreeMap<_, Vec<MatchResponse>> = BTreeMap::new();
    for fixture in matches {
        if !pool.covers(fixture.kickoff) {
            continue;
        }
        if status.is_some_and(|wanted| wanted != fixture.status) {
            continue;
        }
        days.entry(fixture.kickoff.date())
            .or_default()
            .push(fixture.into());
    }

    Ok(PoolMatchesResponse {
        pool_id,
        days: days
            .into_iter()
            .map(|(date, matches)| MatchDayResponse { date, matches })
            .collect(),
        notice,
    })
}

/// Periodically refresh every league and season some pool is bound to.
pub async fn run_refresher(state: SharedState) {
    let period = state.config().fixtures().refresh_interval;
    if period.is_zero() {
        info!("fixture refresher disabled");
        return;
    }

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;

        let bound: BTreeSet<(League, Season)> = state
            .pools()
            .all()
            .into_iter()
            .map(|pool| (pool.league, pool.season))
            .collect();
        for (league, season) in bound {
            if let Err(err) = refresh_league(&state, league, season).await {
                warn!(%league, %season, error = %err, "scheduled fixture refresh failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::BoxFuture;
    use time::macros::{date, datetime};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{fixtures::FixtureProvider, pool_store::memory::MemoryStore},
        dto::pool::CreatePoolRequest,
        state::{AppState, fixture::Match, match_lifecycle::tests::fixture, tests::memory_state},
    };

    struct Scripted(Vec<Match>);

    impl FixtureProvider for Scripted {
        fn fetch_matches(
            &self,
            _league: &LeagueInfo,
            _season: Season,
        ) -> BoxFuture<'static, Result<Vec<Match>, FetchError>> {
            let matches = self.0.clone();
            Box::pin(async move { Ok(matches) })
        }
    }

    fn season() -> Season {
        Season::new(2024).unwrap()
    }

    #[tokio::test]
    async fn provider_failure_serves_cache_with_notice() {
        let (state, _store) = memory_state().await;
        let err = fixtures(&state, League::PremierLeague, season(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Fetch(_)));

        state
            .fixtures()
            .merge(
                League::PremierLeague,
                season(),
                vec![fixture(1, MatchStatus::Scheduled, None)],
            )
            .await;
        let served = fixtures(&state, League::PremierLeague, season(), true)
            .await
            .unwrap();
        assert_eq!(served.matches.len(), 1);
        assert!(served.notice.is_some());
    }

    #[tokio::test]
    async fn refresh_broadcasts_transitions_and_rejections() {
        let mut late = fixture(2, MatchStatus::Scheduled, None);
        late.kickoff = datetime!(2024-10-06 16:30 UTC);
        let provider = Scripted(vec![
            fixture(1, MatchStatus::Finished, Some(Score::new(2, 0))),
            late,
        ]);
        let state = AppState::new(AppConfig::default(), Arc::new(provider));
        state.install_storage(Arc::new(MemoryStore::new())).await;
        state
            .fixtures()
            .merge(
                League::PremierLeague,
                season(),
                vec![
                    fixture(1, MatchStatus::Scheduled, None),
                    fixture(2, MatchStatus::Finished, Some(Score::new(1, 1))),
                ],
            )
            .await;
        let mut events = state.public_sse().subscribe();

        let report = refresh_league(&state, League::PremierLeague, season())
            .await
            .unwrap();
        assert_eq!(report.transitions.len(), 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(
            state.lifecycle().current_status(2).await,
            Some(MatchStatus::Finished)
        );

        let mut names = Vec::new();
        while let Ok(event) = events.try_recv() {
            names.extend(event.event);
        }
        assert_eq!(
            names
                .iter()
                .filter(|name| *name == sse_events::EVENT_MATCH_STATUS)
                .count(),
            2
        );
        assert!(names.iter().any(|name| name == sse_events::EVENT_FIXTURE_REJECTED));
    }

    #[tokio::test]
    async fn pool_matches_are_grouped_by_day_inside_the_window() {
        let (state, _store) = memory_state().await;
        let pool = pool_service::create_pool(
            &state,
            "alice",
            CreatePoolRequest {
                name: "Octubre".into(),
                description: None,
                league: League::PremierLeague,
                season: 2024,
                start_date: date!(2024 - 10 - 01),
                end_date: date!(2024 - 10 - 31),
            },
        )
        .await
        .unwrap();

        let mut same_day = fixture(2, MatchStatus::Finished, Some(Score::new(0, 0)));
        same_day.kickoff = datetime!(2024-10-05 19:00 UTC);
        let mut outside = fixture(3, MatchStatus::Scheduled, None);
        outside.kickoff = datetime!(2024-11-02 15:00 UTC);
        state
            .fixtures()
            .merge(
                League::PremierLeague,
                season(),
                vec![fixture(1, MatchStatus::Scheduled, None), same_day, outside],
            )
            .await;

        let grouped = pool_matches(&state, pool.id, "alice", None).await.unwrap();
        assert_eq!(grouped.days.len(), 1);
        assert_eq!(grouped.days[0].date, date!(2024 - 10 - 05));
        assert_eq!(grouped.days[0].matches.len(), 2);

        let finished = pool_matches(&state, pool.id, "alice", Some(MatchStatus::Finished))
            .await
            .unwrap();
        assert_eq!(finished.days[0].matches.len(), 1);
        assert_eq!(finished.days[0].matches[0].id, 2);
    }
}

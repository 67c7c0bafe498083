//! HTTP client for the football-data.org v4 API.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{debug, warn};

use super::{FetchError, FixtureProvider};
use crate::state::{
    fixture::{Match, MatchStatus, Score, TeamInfo},
    league::{League, LeagueInfo, Season},
};

const AUTH_HEADER: &str = "X-Auth-Token";

/// Connection settings for [`FootballDataClient`].
#[derive(Debug, Clone)]
pub struct FootballDataConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

/// [`FixtureProvider`] backed by football-data.org.
#[derive(Clone)]
pub struct FootballDataClient {
    client: Client,
    base_url: Arc<str>,
    token: Option<Arc<str>>,
}

impl FootballDataClient {
    pub fn new(config: FootballDataConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| FetchError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            token: config.token.map(Arc::from),
        })
    }

    async fn fetch(&self, league: LeagueInfo, season: Season) -> Result<Vec<Match>, FetchError> {
        let url = format!("{}/competitions/{}/matches", self.base_url, league.provider_id);
        let mut request = self
            .client
            .get(&url)
            .query(&[("season", season.year())]);
        if let Some(token) = &self.token {
            request = request.header(AUTH_HEADER, token.as_ref());
        }

        let response = request.send().await.map_err(|source| {
            if source.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Request {
                    url: url.clone(),
                    source,
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }

        let body: MatchesResponse = response.json().await.map_err(|source| {
            if source.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Decode {
                    url: url.clone(),
                    source,
                }
            }
        })?;

        let matches = normalize(league.league, season, body.matches);
        debug!(league = %league.league, %season, count = matches.len(), "fixtures fetched");
        Ok(matches)
    }
}

impl FixtureProvider for FootballDataClient {
    fn fetch_matches(
        &self,
        league: &LeagueInfo,
        season: Season,
    ) -> BoxFuture<'static, Result<Vec<Match>, FetchError>> {
        let client = self.clone();
        let league = league.clone();
        Box::pin(async move { client.fetch(league, season).await })
    }
}

/// Map a provider status onto the lifecycle status.
pub fn map_status(raw: &str) -> Option<MatchStatus> {
    match raw {
        "SCHEDULED" | "TIMED" => Some(MatchStatus::Scheduled),
        "IN_PLAY" | "PAUSED" | "LIVE" | "SUSPENDED" => Some(MatchStatus::Live),
        "FINISHED" | "AWARDED" => Some(MatchStatus::Finished),
        "POSTPONED" | "CANCELLED" => Some(MatchStatus::Postponed),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct MatchesResponse {
    #[serde(default)]
    matches: Vec<ProviderMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderMatch {
    id: i64,
    utc_date: String,
    status: String,
    home_team: ProviderTeam,
    away_team: ProviderTeam,
    #[serde(default)]
    score: Option<ProviderScore>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderTeam {
    id: Option<i64>,
    name: Option<String>,
    short_name: Option<String>,
    crest: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderScore {
    full_time: Option<ProviderGoals>,
}

#[derive(Debug, Deserialize)]
struct ProviderGoals {
    home: Option<u8>,
    away: Option<u8>,
}

impl From<ProviderTeam> for TeamInfo {
    fn from(team: ProviderTeam) -> Self {
        Self {
            id: team.id.unwrap_or_default(),
            name: team.name.unwrap_or_else(|| "TBD".to_owned()),
            short_name: team.short_name,
            crest: team.crest,
        }
    }
}

fn normalize(league: League, season: Season, raw: Vec<ProviderMatch>) -> Vec<Match> {
    raw.into_iter()
        .filter_map(|fixture| normalize_one(league, season, fixture))
        .collect()
}

fn normalize_one(league: League, season: Season, fixture: ProviderMatch) -> Option<Match> {
    let Some(status) = map_status(&fixture.status) else {
        warn!(match_id = fixture.id, status = %fixture.status, "unknown provider status; skipping fixture");
        return None;
    };
    let kickoff = match OffsetDateTime::parse(&fixture.utc_date, &Rfc3339) {
        Ok(kickoff) => kickoff,
        Err(err) => {
            warn!(match_id = fixture.id, error = %err, "invalid kickoff date; skipping fixture");
            return None;
        }
    };

    let full_time = fixture
        .score
        .and_then(|score| score.full_time)
        .and_then(|goals| Some(Score::new(goals.home?, goals.away?)));
    let score = match (status, full_time) {
        (MatchStatus::Finished, Some(score)) => Some(score),
        (MatchStatus::Finished, None) => {
            warn!(match_id = fixture.id, "finished fixture without a final score; skipping");
            return None;
        }
        _ => None,
    };

    Some(Match {
        id: fixture.id,
        league,
        season,
        home: fixture.home_team.into(),
        away: fixture.away_team.into(),
        kickoff,
        status,
        score,
    })
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;
    use crate::state::league::LeagueTable;

    const BODY: &str = r#"{
        "matches": [
            {
                "id": 497410,
                "utcDate": "2024-08-16T19:00:00Z",
                "status": "FINISHED",
                "homeTeam": {"id": 66, "name": "Manchester United FC", "shortName": "Man United", "crest": "https://crests.football-data.org/66.png"},
                "awayTeam": {"id": 63, "name": "Fulham FC", "shortName": "Fulham", "crest": "https://crests.football-data.org/63.png"},
                "score": {"winner": "HOME_TEAM", "fullTime": {"home": 1, "away": 0}}
            },
            {
                "id": 497411,
                "utcDate": "2024-08-17T11:30:00Z",
                "status": "TIMED",
                "homeTeam": {"id": 349, "name": "Ipswich Town FC", "shortName": "Ipswich Town", "crest": null},
                "awayTeam": {"id": 64, "name": "Liverpool FC", "shortName": "Liverpool", "crest": null},
                "score": {"fullTime": {"home": null, "away": null}}
            },
            {
                "id": 497412,
                "utcDate": "2024-08-17T14:00:00Z",
                "status": "FINISHED",
                "homeTeam": {"id": 57, "name": "Arsenal FC"},
                "awayTeam": {"id": 76, "name": "Wolverhampton Wanderers FC"},
                "score": {"fullTime": {"home": null, "away": null}}
            },
            {
                "id": 497413,
                "utcDate": "2024-08-18T15:30:00Z",
                "status": "IN_PLAY",
                "homeTeam": {"id": 65, "name": "Manchester City FC"},
                "awayTeam": {"id": 61, "name": "Chelsea FC"},
                "score": {"fullTime": {"home": 1, "away": 1}}
            }
        ]
    }"#;

    fn premier_league() -> LeagueInfo {
        LeagueTable::default()
            .get(League::PremierLeague)
            .cloned()
            .unwrap()
    }

    fn client(base_url: String) -> FootballDataClient {
        FootballDataClient::new(FootballDataConfig {
            base_url,
            token: Some("secret".into()),
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[test]
    fn provider_statuses_are_mapped() {
        assert_eq!(map_status("TIMED"), Some(MatchStatus::Scheduled));
        assert_eq!(map_status("PAUSED"), Some(MatchStatus::Live));
        assert_eq!(map_status("AWARDED"), Some(MatchStatus::Finished));
        assert_eq!(map_status("CANCELLED"), Some(MatchStatus::Postponed));
        assert_eq!(map_status("SOMETHING_NEW"), None);
    }

    #[tokio::test]
    async fn fetch_normalizes_fixtures() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/competitions/2021/matches")
            .match_query(Matcher::UrlEncoded("season".into(), "2024".into()))
            .match_header("x-auth-token", "secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .create_async()
            .await;

        let matches = client(server.url())
            .fetch_matches(&premier_league(), Season::new(2024).unwrap())
            .await
            .unwrap();
        mock.assert_async().await;

        let ids: Vec<_> = matches.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![497410, 497411, 497413]);

        assert_eq!(matches[0].status, MatchStatus::Finished);
        assert_eq!(matches[0].score, Some(Score::new(1, 0)));
        assert_eq!(matches[0].home.short_name.as_deref(), Some("Man United"));
        assert_eq!(matches[1].status, MatchStatus::Scheduled);
        assert_eq!(matches[2].status, MatchStatus::Live);
        assert_eq!(matches[2].score, None);
        assert!(matches.iter().all(|m| m.league == League::PremierLeague));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/competitions/2021/matches")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let err = client(server.url())
            .fetch_matches(&premier_league(), Season::new(2024).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::Status { status, .. } if status.as_u16() == 429
        ));
    }

    #[tokio::test]
    async fn unexpected_body_is_a_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/competitions/2021/matches")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = client(server.url())
            .fetch_matches(&premier_league(), Season::new(2024).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }
}

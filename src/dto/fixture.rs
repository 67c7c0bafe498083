//! Wire types for leagues, fixtures and the match days of a pool.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use time::{Date, OffsetDateTime};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::state::{
    fixture::{Match, MatchId, MatchStatus, Score, TeamInfo},
    league::{League, Season},
};

/// Query parameters of `GET /fixtures/{league}/{season}`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct FixturesQuery {
    /// Force a provider fetch before answering.
    #[serde(default)]
    pub refresh: bool,
}

/// Query parameters of `GET /pools/{id}/matches`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PoolMatchesQuery {
    /// Only return matches in this status.
    #[serde(default)]
    pub status: Option<MatchStatus>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchResponse {
    pub id: MatchId,
    pub league: League,
    pub season: Season,
    pub home: TeamInfo,
    pub away: TeamInfo,
    #[serde(with = "time::serde::rfc3339")]
    pub kickoff: OffsetDateTime,
    pub status: MatchStatus,
    /// Present once the match is finished.
    pub score: Option<Score>,
}

impl From<Match> for MatchResponse {
    fn from(value: Match) -> Self {
        Self {
            id: value.id,
            league: value.league,
            season: value.season,
            home: value.home,
            away: value.away,
            kickoff: value.kickoff,
            status: value.status,
            score: value.score,
        }
    }
}

/// Cached fixtures of a league and season.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct FixturesResponse {
    pub league: League,
    pub season: Season,
    pub matches: Vec<MatchResponse>,
    /// Set when the provider could not be reached and cached data was served.
    pub notice: Option<String>,
}

/// Matches sharing a kickoff date.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchDayResponse {
    pub date: Date,
    pub matches: Vec<MatchResponse>,
}

/// Matches of a pool inside its date window, grouped by day.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct PoolMatchesResponse {
    pub pool_id: Uuid,
    pub days: Vec<MatchDayResponse>,
    pub notice: Option<String>,
}

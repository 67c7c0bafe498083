use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::state::league::{League, Season};

/// Fixture identifier assigned by the provider.
pub type MatchId = i64;

/// Lifecycle status of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
    Postponed,
}

impl MatchStatus {
    /// Whether predictions on a match in this status are frozen.
    pub fn is_locked(self) -> bool {
        !matches!(self, MatchStatus::Scheduled)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::Finished => "finished",
            MatchStatus::Postponed => "postponed",
        };
        f.write_str(label)
    }
}

/// Goals scored by each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Score {
    pub home: u8,
    pub away: u8,
}

/// Win/draw/loss from the home side's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    HomeWin,
    Draw,
    AwayWin,
}

impl Score {
    pub fn new(home: u8, away: u8) -> Self {
        Self { home, away }
    }

    pub fn outcome(self) -> Outcome {
        match self.home.cmp(&self.away) {
            std::cmp::Ordering::Greater => Outcome::HomeWin,
            std::cmp::Ordering::Equal => Outcome::Draw,
            std::cmp::Ordering::Less => Outcome::AwayWin,
        }
    }
}

/// Display metadata for one side of a fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TeamInfo {
    pub id: i64,
    pub name: String,
    pub short_name: Option<String>,
    pub crest: Option<String>,
}

/// Normalized fixture shared read-only by every pool bound to its league and season.
///
/// `score` is populated if and only if `status` is [`MatchStatus::Finished`]; the
/// lifecycle registry is the only writer and enforces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub id: MatchId,
    pub league: League,
    pub season: Season,
    pub home: TeamInfo,
    pub away: TeamInfo,
    pub kickoff: OffsetDateTime,
    pub status: MatchStatus,
    pub score: Option<Score>,
}

impl Match {
    /// Copy the display metadata of `other` onto this match, leaving status and score alone.
    pub(crate) fn refresh_metadata(&mut self, other: &Match) -> bool {
        let changed =
            self.home != other.home || self.away != other.away || self.kickoff != other.kickoff;
        if changed {
            self.home = other.home.clone();
            self.away = other.away.clone();
            self.kickoff = other.kickoff;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_follows_goal_difference() {
        assert_eq!(Score::new(2, 1).outcome(), Outcome::HomeWin);
        assert_eq!(Score::new(1, 1).outcome(), Outcome::Draw);
        assert_eq!(Score::new(0, 3).outcome(), Outcome::AwayWin);
    }

    #[test]
    fn only_scheduled_is_open() {
        assert!(!MatchStatus::Scheduled.is_locked());
        assert!(MatchStatus::Live.is_locked());
        assert!(MatchStatus::Finished.is_locked());
        assert!(MatchStatus::Postponed.is_locked());
    }
}

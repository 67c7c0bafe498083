//! League identifiers and the mapping table that binds them to the fixtures provider.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Earliest season accepted when binding a pool.
pub const MIN_SEASON: u16 = 2000;
/// Latest season accepted when binding a pool.
pub const MAX_SEASON: u16 = 2100;

/// Competitions a pool can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum League {
    ChampionsLeague,
    LaLiga,
    PremierLeague,
    SerieA,
}

impl League {
    /// Every supported league, in display order.
    pub const ALL: [League; 4] = [
        League::ChampionsLeague,
        League::LaLiga,
        League::PremierLeague,
        League::SerieA,
    ];

    /// Stable identifier used in URLs and persisted documents.
    pub fn slug(self) -> &'static str {
        match self {
            League::ChampionsLeague => "champions_league",
            League::LaLiga => "la_liga",
            League::PremierLeague => "premier_league",
            League::SerieA => "serie_a",
        }
    }

    /// Parse the identifier produced by [`League::slug`].
    pub fn from_slug(slug: &str) -> Option<Self> {
        League::ALL.into_iter().find(|league| league.slug() == slug)
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Season identified by the calendar year it starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Season(u16);

/// Error returned when a season falls outside the accepted range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("season {0} is outside {MIN_SEASON}..={MAX_SEASON}")]
pub struct InvalidSeason(pub u16);

impl Season {
    /// Build a season, rejecting years outside [`MIN_SEASON`]..=[`MAX_SEASON`].
    pub fn new(year: u16) -> Result<Self, InvalidSeason> {
        if (MIN_SEASON..=MAX_SEASON).contains(&year) {
            Ok(Self(year))
        } else {
            Err(InvalidSeason(year))
        }
    }

    pub fn year(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provider-side description of a league.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LeagueInfo {
    pub league: League,
    /// Competition identifier on the fixtures provider.
    pub provider_id: u32,
    /// Human readable name, also accepted when parsing free-text league names.
    pub display_name: String,
}

/// Mapping table resource binding [`League`] variants to the provider.
#[derive(Debug, Clone)]
pub struct LeagueTable {
    entries: IndexMap<League, LeagueInfo>,
}

impl LeagueTable {
    pub fn new(entries: impl IntoIterator<Item = LeagueInfo>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|info| (info.league, info))
                .collect(),
        }
    }

    pub fn get(&self, league: League) -> Option<&LeagueInfo> {
        self.entries.get(&league)
    }

    pub fn contains(&self, league: League) -> bool {
        self.entries.contains_key(&league)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LeagueInfo> {
        self.entries.values()
    }

    /// Resolve a free-text league name (as typed in older clients) through the table.
    pub fn resolve_display_name(&self, name: &str) -> Option<League> {
        let needle = name.trim();
        self.entries
            .values()
            .find(|info| info.display_name.eq_ignore_ascii_case(needle))
            .map(|info| info.league)
    }
}

impl Default for LeagueTable {
    fn default() -> Self {
        Self::new([
            LeagueInfo {
                league: League::ChampionsLeague,
                provider_id: 2001,
                display_name: "UEFA Champions League".into(),
            },
            LeagueInfo {
                league: League::LaLiga,
                provider_id: 2014,
                display_name: "La Liga".into(),
            },
            LeagueInfo {
                league: League::PremierLeague,
                provider_id: 2021,
                display_name: "Premier League".into(),
            },
            LeagueInfo {
                league: League::SerieA,
                provider_id: 2019,
                display_name: "Serie A".into(),
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_maps_provider_ids() {
        let table = LeagueTable::default();
        assert_eq!(table.get(League::ChampionsLeague).unwrap().provider_id, 2001);
        assert_eq!(table.get(League::SerieA).unwrap().provider_id, 2019);
    }

    #[test]
    fn display_names_resolve_case_insensitively() {
        let table = LeagueTable::default();
        assert_eq!(
            table.resolve_display_name(" premier league "),
            Some(League::PremierLeague)
        );
        assert_eq!(table.resolve_display_name("Bundesliga"), None);
    }

    #[test]
    fn slugs_round_trip() {
        for league in League::ALL {
            assert_eq!(League::from_slug(league.slug()), Some(league));
        }
        assert_eq!(League::from_slug("liga_betplay"), None);
    }

    #[test]
    fn season_range_is_enforced() {
        assert!(Season::new(2024).is_ok());
        assert_eq!(Season::new(1999), Err(InvalidSeason(1999)));
        assert_eq!(Season::new(2101), Err(InvalidSeason(2101)));
    }
}

//! Access to the external fixtures provider.

mod error;
pub mod football_data;

pub use error::FetchError;
pub use football_data::{FootballDataClient, FootballDataConfig};

use futures::future::BoxFuture;

use crate::state::{
    fixture::Match,
    league::{LeagueInfo, Season},
};

/// Source of normalized fixtures for a league and season.
pub trait FixtureProvider: Send + Sync {
    fn fetch_matches(
        &self,
        league: &LeagueInfo,
        season: Season,
    ) -> BoxFuture<'static, Result<Vec<Match>, FetchError>>;
}

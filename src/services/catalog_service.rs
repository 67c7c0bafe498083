//! Companion tournament/match catalog and its reference seed data.

use time::{Date, OffsetDateTime, macros::date};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{
        models::{CatalogMatchEntity, MatchResultEntity, TournamentEntity},
        pool_store::CatalogStore,
        storage::StorageError,
    },
    dto::catalog::{
        CatalogMatchResponse, CreateCatalogMatchRequest, CreateTournamentRequest,
        TournamentResponse,
    },
    error::ServiceError,
    state::SharedState,
};

pub async fn create_tournament(
    state: &SharedState,
    request: CreateTournamentRequest,
) -> Result<TournamentResponse, ServiceError> {
    if request.end_date < request.start_date {
        return Err(ServiceError::InvalidInput(format!(
            "end date {} is before start date {}",
            request.end_date, request.start_date
        )));
    }
    let store = state.require_storage().await?;
    let entity = TournamentEntity {
        id: Uuid::new_v4(),
        name: request.name.trim().to_owned(),
        country: request.country,
        season: request.season,
        start_date: request.start_date,
        end_date: request.end_date,
    };
    store.save_tournament(entity.clone()).await?;
    info!(tournament_id = %entity.id, name = %entity.name, "tournament created");
    Ok(entity.into())
}

pub async fn list_tournaments(state: &SharedState) -> Result<Vec<TournamentResponse>, ServiceError> {
    let store = state.require_storage().await?;
    let tournaments = store.list_tournaments().await?;
    Ok(tournaments.into_iter().map(Into::into).collect())
}

pub async fn get_tournament(
    state: &SharedState,
    id: Uuid,
) -> Result<TournamentResponse, ServiceError> {
    let store = state.require_storage().await?;
    store
        .find_tournament(id)
        .await?
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("tournament `{id}` not found")))
}

/// Register a match under an existing tournament.
pub async fn create_match(
    state: &SharedState,
    request: CreateCatalogMatchRequest,
) -> Result<CatalogMatchResponse, ServiceError> {
    let store = state.require_storage().await?;
    if store.find_tournament(request.tournament_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "tournament `{}` not found",
            request.tournament_id
        )));
    }

    let entity = CatalogMatchEntity {
        id: Uuid::new_v4(),
        tournament_id: request.tournament_id,
        home_team: request.home_team,
        away_team: request.away_team,
        match_date: request.match_date,
        stadium: request.stadium,
        result: request.result.map(Into::into),
    };
    store.save_catalog_match(entity.clone()).await?;
    debug!(match_id = %entity.id, tournament_id = %entity.tournament_id, "catalog match created");
    Ok(entity.into())
}

/// Matches of a tournament ordered by date.
pub async fn list_matches(
    state: &SharedState,
    tournament_id: Uuid,
) -> Result<Vec<CatalogMatchResponse>, ServiceError> {
    let store = state.require_storage().await?;
    let matches = store.list_catalog_matches(tournament_id).await?;
    Ok(matches.into_iter().map(Into::into).collect())
}

pub async fn get_match(state: &SharedState, id: Uuid) -> Result<CatalogMatchResponse, ServiceError> {
    let store = state.require_storage().await?;
    store
        .find_catalog_match(id)
        .await?
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("match `{id}` not found")))
}

/// Outcome of a [`seed`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub tournaments_inserted: usize,
    pub matches_inserted: usize,
    /// Tournaments already present by name and season.
    pub skipped: usize,
}

struct SeedTournament {
    name: &'static str,
    country: &'static str,
    season: &'static str,
    start: Date,
    end: Date,
    matches: &'static [SeedMatch],
}

struct SeedMatch {
    home: &'static str,
    away: &'static str,
    date: Date,
    stadium: &'static str,
    result: (u8, u8),
}

const REFERENCE_CATALOG: &[SeedTournament] = &[
    SeedTournament {
        name: "Liga BetPlay",
        country: "Colombia",
        season: "2024",
        start: date!(2024 - 01 - 15),
        end: date!(2024 - 12 - 15),
        matches: &[
            SeedMatch {
                home: "Atlético Nacional",
                away: "Millonarios FC",
                date: date!(2024 - 02 - 15),
                stadium: "Estadio Atanasio Girardot",
                result: (2, 1),
            },
            SeedMatch {
                home: "Deportivo Cali",
                away: "América de Cali",
                date: date!(2024 - 03 - 01),
                stadium: "Estadio Deportivo Cali",
                result: (0, 0),
            },
            SeedMatch {
                home: "Junior FC",
                away: "Santa Fe",
                date: date!(2024 - 03 - 15),
                stadium: "Estadio Metropolitano",
                result: (1, 1),
            },
        ],
    },
    SeedTournament {
        name: "Champions League",
        country: "Europa",
        season: "2024/2025",
        start: date!(2024 - 09 - 15),
        end: date!(2025 - 05 - 28),
        matches: &[
            SeedMatch {
                home: "FC Barcelona",
                away: "Manchester City",
                date: date!(2024 - 10 - 15),
                stadium: "Camp Nou",
                result: (3, 2),
            },
            SeedMatch {
                home: "Real Madrid",
                away: "Chelsea FC",
                date: date!(2024 - 10 - 20),
                stadium: "Santiago Bernabéu",
                result: (2, 0),
            },
            SeedMatch {
                home: "Liverpool FC",
                away: "Paris Saint-Germain",
                date: date!(2024 - 11 - 01),
                stadium: "Anfield",
                result: (1, 3),
            },
        ],
    },
    SeedTournament {
        name: "Copa Libertadores",
        country: "Sudamérica",
        season: "2024",
        start: date!(2024 - 03 - 01),
        end: date!(2024 - 11 - 30),
        matches: &[
            SeedMatch {
                home: "Boca Juniors",
                away: "River Plate",
                date: date!(2024 - 04 - 10),
                stadium: "La Bombonera",
                result: (1, 1),
            },
            SeedMatch {
                home: "Flamengo",
                away: "Palmeiras",
                date: date!(2024 - 05 - 20),
                stadium: "Maracanã",
                result: (2, 2),
            },
            SeedMatch {
                home: "Gremio",
                away: "Santos FC",
                date: date!(2024 - 06 - 01),
                stadium: "Arena do Grêmio",
                result: (3, 1),
            },
        ],
    },
    SeedTournament {
        name: "UEFA Europa League",
        country: "Europa",
        season: "2024/2025",
        start: date!(2024 - 09 - 20),
        end: date!(2025 - 05 - 22),
        matches: &[
            SeedMatch {
                home: "Manchester United",
                away: "AC Milan",
                date: date!(2024 - 09 - 25),
                stadium: "Old Trafford",
                result: (2, 2),
            },
            SeedMatch {
                home: "Arsenal FC",
                away: "AS Roma",
                date: date!(2024 - 10 - 05),
                stadium: "Emirates Stadium",
                result: (1, 0),
            },
            SeedMatch {
                home: "Sevilla FC",
                away: "Villarreal CF",
                date: date!(2024 - 11 - 15),
                stadium: "Ramón Sánchez Pizjuán",
                result: (3, 2),
            },
        ],
    },
];

/// Insert the reference tournaments and their matches, skipping tournaments that already
/// exist by name and season.
pub async fn seed<S>(store: &S) -> Result<SeedReport, StorageError>
where
    S: CatalogStore + ?Sized,
{
    let mut report = SeedReport::default();
    for tournament in REFERENCE_CATALOG {
        let existing = store
            .find_tournament_by_name(tournament.name.into(), tournament.season.into())
            .await?;
        if existing.is_some() {
            debug!(name = tournament.name, season = tournament.season, "tournament already seeded");
            report.skipped += 1;
            continue;
        }

        let tournament_id = Uuid::new_v4();
        store
            .save_tournament(TournamentEntity {
                id: tournament_id,
                name: tournament.name.into(),
                country: tournament.country.into(),
                season: tournament.season.into(),
                start_date: tournament.start,
                end_date: tournament.end,
            })
            .await?;
        report.tournaments_inserted += 1;

        for seeded in tournament.matches {
            let (home_goals, away_goals) = seeded.result;
            store
                .save_catalog_match(CatalogMatchEntity {
                    id: Uuid::new_v4(),
                    tournament_id,
                    home_team: seeded.home.into(),
                    away_team: seeded.away.into(),
                    match_date: OffsetDateTime::new_utc(seeded.date, time::Time::MIDNIGHT),
                    stadium: seeded.stadium.into(),
                    result: Some(MatchResultEntity {
                        home_goals,
                        away_goals,
                    }),
                })
                .await?;
            report.matches_inserted += 1;
        }
        info!(
            name = tournament.name,
            season = tournament.season,
            matches = tournament.matches.len(),
            "tournament seeded"
        );
    }
    Ok(report)
}

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::fixture::{FixturesQuery, FixturesResponse},
    error::AppError,
    services::fixture_service,
    state::{
        SharedState,
        league::{League, LeagueInfo, Season},
    },
};

/// League and fixture lookups. These routes are public.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/leagues", get(list_leagues))
        .route("/fixtures/{league}/{season}", get(get_fixtures))
}

#[utoipa::path(
    get,
    path = "/leagues",
    tag = "fixtures",
    responses((status = 200, description = "Leagues pools can be bound to", body = [LeagueInfo]))
)]
pub async fn list_leagues(State(state): State<SharedState>) -> Json<Vec<LeagueInfo>> {
    Json(fixture_service::list_leagues(&state))
}

/// Cached fixtures of a league and season, refreshed from the provider when asked or empty.
#[utoipa::path(
    get,
    path = "/fixtures/{league}/{season}",
    tag = "fixtures",
    params(
        ("league" = String, Path, description = "League slug such as `premier_league`, or its display name"),
        ("season" = u16, Path, description = "Starting year of the season"),
        FixturesQuery
    ),
    responses(
        (status = 200, description = "Fixtures of the league", body = FixturesResponse),
        (status = 400, description = "Unknown league or invalid season"),
        (status = 502, description = "Provider unreachable and nothing cached")
    )
)]
pub async fn get_fixtures(
    State(state): State<SharedState>,
    Path((league, season)): Path<(String, u16)>,
    Query(query): Query<FixturesQuery>,
) -> Result<Json<FixturesResponse>, AppError> {
    let league = League::from_slug(&league)
        .or_else(|| state.fixtures().leagues().resolve_display_name(&league))
        .ok_or_else(|| AppError::BadRequest(format!("unknown league `{league}`")))?;
    let season = Season::new(season).map_err(|err| AppError::BadRequest(err.to_string()))?;
    Ok(Json(
        fixture_service::fixtures(&state, league, season, query.refresh).await?,
    ))
}

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::catalog::{
        CatalogMatchResponse, CreateCatalogMatchRequest, CreateTournamentRequest,
        TournamentResponse,
    },
    error::AppError,
    services::catalog_service,
    state::SharedState,
};

/// Companion catalog of tournaments and matches under `/api`.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route(
            "/api/tournaments",
            get(list_tournaments).post(create_tournament),
        )
        .route("/api/tournaments/{id}", get(get_tournament))
        .route("/api/matches", post(create_match))
        .route("/api/matches/{tournament_id}", get(list_matches))
        .route("/api/match/{id}", get(get_match))
}

#[utoipa::path(
    post,
    path = "/api/tournaments",
    tag = "catalog",
    request_body = CreateTournamentRequest,
    responses(
        (status = 201, description = "Tournament created", body = TournamentResponse),
        (status = 400, description = "Invalid tournament")
    )
)]
pub async fn create_tournament(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<CreateTournamentRequest>>,
) -> Result<(StatusCode, Json<TournamentResponse>), AppError> {
    let tournament = catalog_service::create_tournament(&state, request).await?;
    Ok((StatusCode::CREATED, Json(tournament)))
}

#[utoipa::path(
    get,
    path = "/api/tournaments",
    tag = "catalog",
    responses((status = 200, description = "Every tournament", body = [TournamentResponse]))
)]
pub async fn list_tournaments(
    State(state): State<SharedState>,
) -> Result<Json<Vec<TournamentResponse>>, AppError> {
    Ok(Json(catalog_service::list_tournaments(&state).await?))
}

#[utoipa::path(
    get,
    path = "/api/tournaments/{id}",
    tag = "catalog",
    params(("id" = Uuid, Path, description = "Tournament identifier")),
    responses(
        (status = 200, description = "Tournament", body = TournamentResponse),
        (status = 404, description = "Tournament not found")
    )
)]
pub async fn get_tournament(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TournamentResponse>, AppError> {
    Ok(Json(catalog_service::get_tournament(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/matches",
    tag = "catalog",
    request_body = CreateCatalogMatchRequest,
    responses(
        (status = 201, description = "Match created", body = CatalogMatchResponse),
        (status = 404, description = "Tournament not found")
    )
)]
pub async fn create_match(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<CreateCatalogMatchRequest>>,
) -> Result<(StatusCode, Json<CatalogMatchResponse>), AppError> {
    let created = catalog_service::create_match(&state, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Matches of a tournament ordered by date.
#[utoipa::path(
    get,
    path = "/api/matches/{tournament_id}",
    tag = "catalog",
    params(("tournament_id" = Uuid, Path, description = "Tournament identifier")),
    responses((status = 200, description = "Matches of the tournament", body = [CatalogMatchResponse]))
)]
pub async fn list_matches(
    State(state): State<SharedState>,
    Path(tournament_id): Path<Uuid>,
) -> Result<Json<Vec<CatalogMatchResponse>>, AppError> {
    Ok(Json(
        catalog_service::list_matches(&state, tournament_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/match/{id}",
    tag = "catalog",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Catalog match", body = CatalogMatchResponse),
        (status = 404, description = "Match not found")
    )
)]
pub async fn get_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CatalogMatchResponse>, AppError> {
    Ok(Json(catalog_service::get_match(&state, id).await?))
}

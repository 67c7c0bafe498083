use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        fixture::{PoolMatchesQuery, PoolMatchesResponse},
        pool::{
            AddMemberRequest, CreatePoolRequest, PoolDetailResponse, PoolListQuery,
            PoolListResponse, PoolResponse, UpdatePoolRequest,
        },
        prediction::{PredictionResponse, SubmissionResponse, SubmitPredictionRequest},
        standings::StandingsResponse,
    },
    error::AppError,
    routes::session::{SessionUser, require_session},
    services::{fixture_service, pool_service, prediction_service, standings_service},
    state::{SharedState, fixture::MatchId},
};

/// Pool, prediction and standings endpoints. Every route requires an active session.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/pools", get(list_pools).post(create_pool))
        .route(
            "/pools/{id}",
            get(get_pool).patch(update_pool).delete(delete_pool),
        )
        .route("/pools/{id}/members", post(add_member))
        .route("/pools/{id}/members/{user_id}", delete(remove_member))
        .route("/pools/{id}/matches", get(pool_matches))
        .route("/pools/{id}/predictions", get(list_predictions))
        // one segment shared by the participant listing (GET) and the match submission (PUT)
        .route(
            "/pools/{id}/predictions/{key}",
            get(list_user_predictions).put(submit_prediction),
        )
        .route("/pools/{id}/standings", get(standings))
        .route_layer(middleware::from_fn_with_state(state, require_session))
}

/// Pools the caller participates in.
#[utoipa::path(
    get,
    path = "/pools",
    tag = "pools",
    params(
        ("X-User-Id" = String, Header, description = "Signed-in user"),
        PoolListQuery
    ),
    responses((status = 200, description = "Pools of the caller", body = PoolListResponse))
)]
pub async fn list_pools(
    State(state): State<SharedState>,
    Extension(SessionUser(user_id)): Extension<SessionUser>,
    Query(query): Query<PoolListQuery>,
) -> Result<Json<PoolListResponse>, AppError> {
    Ok(Json(
        pool_service::list_pools(&state, &user_id, query.filter).await?,
    ))
}

/// Create a pool owned by the caller.
#[utoipa::path(
    post,
    path = "/pools",
    tag = "pools",
    params(("X-User-Id" = String, Header, description = "Signed-in user")),
    request_body = CreatePoolRequest,
    responses(
        (status = 201, description = "Pool created", body = PoolResponse),
        (status = 400, description = "Invalid pool definition"),
        (status = 503, description = "Remote store unavailable")
    )
)]
pub async fn create_pool(
    State(state): State<SharedState>,
    Extension(SessionUser(user_id)): Extension<SessionUser>,
    Valid(Json(request)): Valid<Json<CreatePoolRequest>>,
) -> Result<(StatusCode, Json<PoolResponse>), AppError> {
    let pool = pool_service::create_pool(&state, &user_id, request).await?;
    Ok((StatusCode::CREATED, Json(pool)))
}

#[utoipa::path(
    get,
    path = "/pools/{id}",
    tag = "pools",
    params(
        ("X-User-Id" = String, Header, description = "Signed-in user"),
        ("id" = Uuid, Path, description = "Pool identifier")
    ),
    responses(
        (status = 200, description = "Pool details", body = PoolDetailResponse),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Pool not found")
    )
)]
pub async fn get_pool(
    State(state): State<SharedState>,
    Extension(SessionUser(user_id)): Extension<SessionUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PoolDetailResponse>, AppError> {
    Ok(Json(pool_service::get_pool(&state, id, &user_id).await?))
}

/// Rename the pool or change its description.
#[utoipa::path(
    patch,
    path = "/pools/{id}",
    tag = "pools",
    params(
        ("X-User-Id" = String, Header, description = "Signed-in user"),
        ("id" = Uuid, Path, description = "Pool identifier")
    ),
    request_body = UpdatePoolRequest,
    responses(
        (status = 200, description = "Pool updated", body = PoolResponse),
        (status = 403, description = "Caller is not the owner")
    )
)]
pub async fn update_pool(
    State(state): State<SharedState>,
    Extension(SessionUser(user_id)): Extension<SessionUser>,
    Path(id): Path<Uuid>,
    Valid(Json(request)): Valid<Json<UpdatePoolRequest>>,
) -> Result<Json<PoolResponse>, AppError> {
    Ok(Json(
        pool_service::update_pool(&state, id, &user_id, request).await?,
    ))
}

/// Delete the pool and its predictions.
#[utoipa::path(
    delete,
    path = "/pools/{id}",
    tag = "pools",
    params(
        ("X-User-Id" = String, Header, description = "Signed-in user"),
        ("id" = Uuid, Path, description = "Pool identifier")
    ),
    responses(
        (status = 204, description = "Pool deleted"),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Pool not found")
    )
)]
pub async fn delete_pool(
    State(state): State<SharedState>,
    Extension(SessionUser(user_id)): Extension<SessionUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    pool_service::delete_pool(&state, id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/pools/{id}/members",
    tag = "pools",
    params(
        ("X-User-Id" = String, Header, description = "Signed-in user"),
        ("id" = Uuid, Path, description = "Pool identifier")
    ),
    request_body = AddMemberRequest,
    responses(
        (status = 200, description = "Participant added", body = PoolResponse),
        (status = 403, description = "Caller is not the owner")
    )
)]
pub async fn add_member(
    State(state): State<SharedState>,
    Extension(SessionUser(user_id)): Extension<SessionUser>,
    Path(id): Path<Uuid>,
    Valid(Json(request)): Valid<Json<AddMemberRequest>>,
) -> Result<Json<PoolResponse>, AppError> {
    Ok(Json(
        pool_service::add_member(&state, id, &user_id, request).await?,
    ))
}

/// Remove a participant together with their predictions.
#[utoipa::path(
    delete,
    path = "/pools/{id}/members/{user_id}",
    tag = "pools",
    params(
        ("X-User-Id" = String, Header, description = "Signed-in user"),
        ("id" = Uuid, Path, description = "Pool identifier"),
        ("user_id" = String, Path, description = "Participant to remove")
    ),
    responses(
        (status = 200, description = "Participant removed", body = PoolResponse),
        (status = 400, description = "The owner cannot be removed"),
        (status = 403, description = "Caller is not the owner")
    )
)]
pub async fn remove_member(
    State(state): State<SharedState>,
    Extension(SessionUser(requester)): Extension<SessionUser>,
    Path((id, user_id)): Path<(Uuid, String)>,
) -> Result<Json<PoolResponse>, AppError> {
    Ok(Json(
        pool_service::remove_member(&state, id, &requester, &user_id).await?,
    ))
}

/// Matches of the pool's league inside its date window, grouped by day.
#[utoipa::path(
    get,
    path = "/pools/{id}/matches",
    tag = "pools",
    params(
        ("X-User-Id" = String, Header, description = "Signed-in user"),
        ("id" = Uuid, Path, description = "Pool identifier"),
        PoolMatchesQuery
    ),
    responses((status = 200, description = "Match days of the pool", body = PoolMatchesResponse))
)]
pub async fn pool_matches(
    State(state): State<SharedState>,
    Extension(SessionUser(user_id)): Extension<SessionUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<PoolMatchesQuery>,
) -> Result<Json<PoolMatchesResponse>, AppError> {
    Ok(Json(
        fixture_service::pool_matches(&state, id, &user_id, query.status).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/pools/{id}/predictions",
    tag = "pools",
    params(
        ("X-User-Id" = String, Header, description = "Signed-in user"),
        ("id" = Uuid, Path, description = "Pool identifier")
    ),
    responses((status = 200, description = "Predictions of the pool", body = [PredictionResponse]))
)]
pub async fn list_predictions(
    State(state): State<SharedState>,
    Extension(SessionUser(user_id)): Extension<SessionUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PredictionResponse>>, AppError> {
    Ok(Json(
        prediction_service::list_for_pool(&state, id, &user_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/pools/{id}/predictions/{user_id}",
    tag = "pools",
    params(
        ("X-User-Id" = String, Header, description = "Signed-in user"),
        ("id" = Uuid, Path, description = "Pool identifier"),
        ("user_id" = String, Path, description = "Participant")
    ),
    responses((status = 200, description = "Predictions of one participant", body = [PredictionResponse]))
)]
pub async fn list_user_predictions(
    State(state): State<SharedState>,
    Extension(SessionUser(requester)): Extension<SessionUser>,
    Path((id, user_id)): Path<(Uuid, String)>,
) -> Result<Json<Vec<PredictionResponse>>, AppError> {
    Ok(Json(
        prediction_service::list_for_user(&state, id, &requester, &user_id).await?,
    ))
}

/// Store the caller's prediction while the match is still scheduled.
#[utoipa::path(
    put,
    path = "/pools/{id}/predictions/{match_id}",
    tag = "pools",
    params(
        ("X-User-Id" = String, Header, description = "Signed-in user"),
        ("id" = Uuid, Path, description = "Pool identifier"),
        ("match_id" = i64, Path, description = "Fixture identifier")
    ),
    request_body = SubmitPredictionRequest,
    responses(
        (status = 200, description = "Prediction stored", body = SubmissionResponse),
        (status = 400, description = "Invalid score or match outside the pool"),
        (status = 423, description = "Predictions closed for this match")
    )
)]
pub async fn submit_prediction(
    State(state): State<SharedState>,
    Extension(SessionUser(user_id)): Extension<SessionUser>,
    Path((id, match_id)): Path<(Uuid, MatchId)>,
    Valid(Json(request)): Valid<Json<SubmitPredictionRequest>>,
) -> Result<Json<SubmissionResponse>, AppError> {
    Ok(Json(
        prediction_service::submit_prediction(&state, id, match_id, &user_id, request).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/pools/{id}/standings",
    tag = "pools",
    params(
        ("X-User-Id" = String, Header, description = "Signed-in user"),
        ("id" = Uuid, Path, description = "Pool identifier")
    ),
    responses((status = 200, description = "Leaderboard of the pool", body = StandingsResponse))
)]
pub async fn standings(
    State(state): State<SharedState>,
    Extension(SessionUser(user_id)): Extension<SessionUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<StandingsResponse>, AppError> {
    Ok(Json(
        standings_service::standings(&state, id, &user_id).await?,
    ))
}

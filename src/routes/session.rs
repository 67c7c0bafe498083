use axum::{
    Extension, Json, Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use axum_valid::Valid;

use crate::{
    dto::session::{LoginRequest, ProfileResponse, UpdateProfileRequest},
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Header carrying the identity of the signed-in user.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity of the caller, inserted by [`require_session`].
#[derive(Debug, Clone)]
pub struct SessionUser(pub String);

/// Session endpoints. Login is open; the others require an active session.
pub fn router(state: SharedState) -> Router<SharedState> {
    let protected = Router::new()
        .route("/session", delete(logout))
        .route("/session/profile", get(get_profile).put(update_profile))
        .route_layer(middleware::from_fn_with_state(state, require_session));

    Router::new().route("/session", post(login)).merge(protected)
}

/// Start a session for a user authenticated by the identity provider.
#[utoipa::path(
    post,
    path = "/session",
    tag = "session",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session started", body = ProfileResponse),
        (status = 400, description = "Invalid login payload")
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<LoginRequest>>,
) -> Result<Json<ProfileResponse>, AppError> {
    Ok(Json(session_service::login(&state, request).await?))
}

/// End the caller's session.
#[utoipa::path(
    delete,
    path = "/session",
    tag = "session",
    params(("X-User-Id" = String, Header, description = "Signed-in user")),
    responses(
        (status = 204, description = "Session ended"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout(
    State(state): State<SharedState>,
    Extension(SessionUser(user_id)): Extension<SessionUser>,
) -> StatusCode {
    session_service::logout(&state, &user_id);
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    get,
    path = "/session/profile",
    tag = "session",
    params(("X-User-Id" = String, Header, description = "Signed-in user")),
    responses(
        (status = 200, description = "Profile of the caller", body = ProfileResponse),
        (status = 401, description = "No active session")
    )
)]
pub async fn get_profile(
    State(state): State<SharedState>,
    Extension(SessionUser(user_id)): Extension<SessionUser>,
) -> Result<Json<ProfileResponse>, AppError> {
    Ok(Json(session_service::profile(&state, &user_id)?))
}

/// Change display name, avatar reference or address.
#[utoipa::path(
    put,
    path = "/session/profile",
    tag = "session",
    params(("X-User-Id" = String, Header, description = "Signed-in user")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 401, description = "No active session")
    )
)]
pub async fn update_profile(
    State(state): State<SharedState>,
    Extension(SessionUser(user_id)): Extension<SessionUser>,
    Valid(Json(request)): Valid<Json<UpdateProfileRequest>>,
) -> Result<Json<ProfileResponse>, AppError> {
    Ok(Json(
        session_service::update_profile(&state, &user_id, request).await?,
    ))
}

/// Reject requests without an active session and expose the caller as [`SessionUser`].
pub async fn require_session(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Unauthorized("missing user header `X-User-Id`".into()))?;

    session_service::require_session(&state, &user_id)?;
    req.extensions_mut().insert(SessionUser(user_id));
    Ok(next.run(req).await)
}


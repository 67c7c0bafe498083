use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::{fixtures::FetchError, storage::StorageError},
    state::{
        fixture::{MatchId, MatchStatus},
        league::InvalidSeason,
        pool::PoolValidationError,
        prediction::InvalidGoals,
    },
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// No active session for the caller.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The caller is known but not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Predictions for the match are closed.
    #[error("predictions closed: match {match_id} is {status}")]
    Locked {
        match_id: MatchId,
        status: MatchStatus,
    },
    /// The fixtures provider could not be queried.
    #[error("fixtures provider failed")]
    Fetch(#[source] FetchError),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<FetchError> for ServiceError {
    fn from(err: FetchError) -> Self {
        ServiceError::Fetch(err)
    }
}

impl From<PoolValidationError> for ServiceError {
    fn from(err: PoolValidationError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<InvalidGoals> for ServiceError {
    fn from(err: InvalidGoals) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<InvalidSeason> for ServiceError {
    fn from(err: InvalidSeason) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Missing or inactive session.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Authenticated but not allowed.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The match no longer accepts predictions.
    #[error("predictions closed: {0}")]
    Locked(String),
    /// Upstream provider failure.
    #[error("bad gateway: {0}")]
    BadGateway(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Locked { match_id, status } => {
                AppError::Locked(format!("match {match_id} is {status}"))
            }
            ServiceError::Fetch(source) => AppError::BadGateway(source.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Locked(_) => StatusCode::LOCKED,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_maps_to_423() {
        let err: AppError = ServiceError::Locked {
            match_id: 12,
            status: MatchStatus::Live,
        }
        .into();
        assert_eq!(err.to_string(), "predictions closed: match 12 is live");
        assert_eq!(err.into_response().status(), StatusCode::LOCKED);
    }

    #[test]
    fn provider_failures_are_bad_gateway() {
        let err: AppError = ServiceError::Fetch(FetchError::Timeout).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn validation_failures_are_bad_requests() {
        let err: AppError = ServiceError::from(PoolValidationError::EmptyName).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_outages_are_service_unavailable() {
        let outage = StorageError::unavailable("ping failed".into(), std::io::Error::other("refused"));
        let err: AppError = ServiceError::from(outage).into();
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

        let err: AppError = ServiceError::Degraded.into();
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

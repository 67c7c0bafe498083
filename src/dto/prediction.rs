use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::state::{
    fixture::MatchId,
    prediction::{MAX_GOALS, Prediction},
};

/// Predicted final score for one match.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitPredictionRequest {
    #[validate(range(min = 0, max = MAX_GOALS))]
    pub home_goals: i64,
    #[validate(range(min = 0, max = MAX_GOALS))]
    pub away_goals: i64,
}

/// Stored prediction.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PredictionResponse {
    pub pool_id: Uuid,
    pub match_id: MatchId,
    pub user_id: String,
    pub home_goals: u8,
    pub away_goals: u8,
    /// Server timestamp in microseconds since the epoch.
    pub submitted_at: i64,
}

impl From<Prediction> for PredictionResponse {
    fn from(prediction: Prediction) -> Self {
        Self {
            pool_id: prediction.key.pool_id,
            match_id: prediction.key.match_id,
            user_id: prediction.key.user_id,
            home_goals: prediction.score.home,
            away_goals: prediction.score.away,
            submitted_at: prediction.submitted_at,
        }
    }
}

/// Result of a submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionResponse {
    /// `false` when a newer entry for the same key was already stored.
    pub applied: bool,
    pub prediction: PredictionResponse,
}

//! Wire types of the companion catalog API. Field names are camelCase to match the catalog's
//! historical clients.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use time::{Date, OffsetDateTime};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{CatalogMatchEntity, MatchResultEntity, TournamentEntity},
    dto::validation::validate_not_blank,
};

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTournamentRequest {
    #[validate(length(min = 1, max = 120), custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(length(min = 1, max = 80))]
    pub country: String,
    /// Free-form label such as `2024` or `2024/2025`.
    #[validate(length(min = 1, max = 20))]
    pub season: String,
    pub start_date: Date,
    pub end_date: Date,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TournamentResponse {
    pub id: Uuid,
    pub name: String,
    pub country: String,
    pub season: String,
    pub start_date: Date,
    pub end_date: Date,
}

impl From<TournamentEntity> for TournamentResponse {
    fn from(entity: TournamentEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            country: entity.country,
            season: entity.season,
            start_date: entity.start_date,
            end_date: entity.end_date,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MatchResultDto {
    #[validate(range(max = 99))]
    pub home_goals: u8,
    #[validate(range(max = 99))]
    pub away_goals: u8,
}

impl From<MatchResultEntity> for MatchResultDto {
    fn from(value: MatchResultEntity) -> Self {
        Self {
            home_goals: value.home_goals,
            away_goals: value.away_goals,
        }
    }
}

impl From<MatchResultDto> for MatchResultEntity {
    fn from(value: MatchResultDto) -> Self {
        Self {
            home_goals: value.home_goals,
            away_goals: value.away_goals,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCatalogMatchRequest {
    pub tournament_id: Uuid,
    #[validate(length(min = 1, max = 80))]
    pub home_team: String,
    #[validate(length(min = 1, max = 80))]
    pub away_team: String,
    #[serde(with = "time::serde::rfc3339")]
    pub match_date: OffsetDateTime,
    #[validate(length(min = 1, max = 120))]
    pub stadium: String,
    #[serde(default)]
    #[validate(nested)]
    pub result: Option<MatchResultDto>,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMatchResponse {
    pub id: Uuid,
    pub tournament_id: Uuid,
    pub home_team: String,
    pub away_team: String,
    #[serde(with = "time::serde::rfc3339")]
    pub match_date: OffsetDateTime,
    pub stadium: String,
    pub result: Option<MatchResultDto>,
}

impl From<CatalogMatchEntity> for CatalogMatchResponse {
    fn from(entity: CatalogMatchEntity) -> Self {
        Self {
            id: entity.id,
            tournament_id: entity.tournament_id,
            home_team: entity.home_team,
            away_team: entity.away_team,
            match_date: entity.match_date,
            stadium: entity.stadium,
            result: entity.result.map(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_request_uses_camel_case() {
        let request: CreateCatalogMatchRequest = serde_json::from_str(
            r#"{
                "tournamentId": "7b6f0c1e-9a52-4f43-8c8f-3d2b3f0c9a11",
                "homeTeam": "Boca Juniors",
                "awayTeam": "River Plate",
                "matchDate": "2024-04-10T00:00:00Z",
                "stadium": "La Bombonera",
                "result": {"homeGoals": 1, "awayGoals": 1}
            }"#,
        )
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.result.unwrap().home_goals, 1);
    }

    #[test]
    fn impossible_results_are_rejected() {
        let request = CreateCatalogMatchRequest {
            tournament_id: Uuid::new_v4(),
            home_team: "Flamengo".into(),
            away_team: "Palmeiras".into(),
            match_date: OffsetDateTime::UNIX_EPOCH,
            stadium: "Maracanã".into(),
            result: Some(MatchResultDto {
                home_goals: 120,
                away_goals: 0,
            }),
        };
        assert!(request.validate().is_err());
    }
}

//! Wire types of the pool routes.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use time::{Date, OffsetDateTime};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::validation::{validate_not_blank, validate_user_id},
    state::{
        league::{League, Season},
        pool::{
            MAX_DESCRIPTION_CHARS, MAX_NAME_CHARS, Pool, PoolChanges, PoolFilter, PoolStatus,
        },
    },
};

// validator's `length` bounds are u64.
const NAME_LIMIT: u64 = MAX_NAME_CHARS as u64;
const DESCRIPTION_LIMIT: u64 = MAX_DESCRIPTION_CHARS as u64;

/// Payload used to create a pool. The caller becomes its owner.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreatePoolRequest {
    #[validate(length(min = 1, max = NAME_LIMIT), custom(function = "validate_not_blank"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = DESCRIPTION_LIMIT))]
    pub description: Option<String>,
    pub league: League,
    /// Starting year of the season, e.g. `2024`.
    #[validate(range(min = 2000, max = 2100))]
    pub season: u16,
    pub start_date: Date,
    pub end_date: Date,
}

/// Owner-only metadata changes. Omitted fields are left untouched; an empty description clears it.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdatePoolRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = NAME_LIMIT))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(max = DESCRIPTION_LIMIT))]
    pub description: Option<String>,
}

impl From<UpdatePoolRequest> for PoolChanges {
    fn from(value: UpdatePoolRequest) -> Self {
        Self {
            name: value.name,
            description: value.description,
        }
    }
}

/// Owner-only request adding a participant.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddMemberRequest {
    #[validate(custom(function = "validate_user_id"))]
    pub user_id: String,
}

/// Query parameters of `GET /pools`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PoolListQuery {
    /// `active`, `finished` or `all` (default).
    #[serde(default)]
    pub filter: PoolFilter,
}

/// Pool as returned by the API. `status` is derived from the end date.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PoolResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner: String,
    pub league: League,
    pub season: Season,
    pub start_date: Date,
    pub end_date: Date,
    pub status: PoolStatus,
    /// Owner first, then members in join order.
    pub participants: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PoolResponse {
    pub fn from_pool(pool: Pool, today: Date) -> Self {
        Self {
            status: pool.status(today),
            id: pool.id,
            name: pool.name,
            description: pool.description,
            owner: pool.owner,
            league: pool.league,
            season: pool.season,
            start_date: pool.start_date,
            end_date: pool.end_date,
            participants: pool.participants,
            created_at: pool.created_at,
            updated_at: pool.updated_at,
        }
    }
}

/// Pools visible to the caller.
#[derive(Debug, Serialize, ToSchema)]
pub struct PoolListResponse {
    pub pools: Vec<PoolResponse>,
    /// Set when the list was served from the local snapshot.
    pub offline: bool,
}

/// One pool together with the freshness flag.
#[derive(Debug, Serialize, ToSchema)]
pub struct PoolDetailResponse {
    pub pool: PoolResponse,
    /// Set when the pool was served from the local snapshot.
    pub offline: bool,
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn request() -> CreatePoolRequest {
        CreatePoolRequest {
            name: "Familia".into(),
            description: None,
            league: League::LaLiga,
            season: 2024,
            start_date: date!(2024 - 08 - 15),
            end_date: date!(2025 - 05 - 25),
        }
    }

    #[test]
    fn create_request_bounds_are_checked() {
        assert!(request().validate().is_ok());

        let mut blank = request();
        blank.name = "  ".into();
        assert!(blank.validate().is_err());

        let mut long_name = request();
        long_name.name = "x".repeat(MAX_NAME_CHARS + 1);
        assert!(long_name.validate().is_err());

        let mut long_description = request();
        long_description.description = Some("x".repeat(MAX_DESCRIPTION_CHARS + 1));
        assert!(long_description.validate().is_err());

        let mut ancient = request();
        ancient.season = 1999;
        assert!(ancient.validate().is_err());
    }

    #[test]
    fn create_request_parses_iso_dates() {
        let parsed: CreatePoolRequest = serde_json::from_str(
            r#"{"name":"Oficina","league":"serie_a","season":2024,"start_date":"2024-08-17","end_date":"2025-05-25"}"#,
        )
        .unwrap();
        assert_eq!(parsed.league, League::SerieA);
        assert_eq!(parsed.start_date, date!(2024 - 08 - 17));
    }

    #[test]
    fn update_request_bounds_are_checked() {
        let longest = UpdatePoolRequest {
            name: Some("x".repeat(MAX_NAME_CHARS)),
            description: Some("y".repeat(MAX_DESCRIPTION_CHARS)),
        };
        assert!(longest.validate().is_ok());

        let too_long = UpdatePoolRequest {
            name: Some("x".repeat(MAX_NAME_CHARS + 1)),
            ..Default::default()
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn member_ids_are_validated() {
        let bad = AddMemberRequest {
            user_id: "two words".into(),
        };
        assert!(bad.validate().is_err());
    }
}

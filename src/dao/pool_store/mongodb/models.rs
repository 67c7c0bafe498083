use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::{
    dao::models::{
        CatalogMatchEntity, MatchResultEntity, PoolEntity, PredictionEntity, TournamentEntity,
    },
    state::league::{League, Season},
};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPoolDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    description: Option<String>,
    owner: String,
    league: League,
    season: Season,
    start_date: String,
    end_date: String,
    participants: Vec<String>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<PoolEntity> for MongoPoolDocument {
    fn from(value: PoolEntity) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            description: value.description,
            owner: value.owner,
            league: value.league,
            season: value.season,
            start_date: format_date(value.start_date),
            end_date: format_date(value.end_date),
            participants: value.participants,
            created_at: to_bson_datetime(value.created_at),
            updated_at: to_bson_datetime(value.updated_at),
        }
    }
}

impl TryFrom<MongoPoolDocument> for PoolEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoPoolDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_uuid(&value.id)?,
            start_date: parse_date(&value.id, &value.start_date)?,
            end_date: parse_date(&value.id, &value.end_date)?,
            created_at: from_bson_datetime(&value.id, value.created_at)?,
            updated_at: from_bson_datetime(&value.id, value.updated_at)?,
            name: value.name,
            description: value.description,
            owner: value.owner,
            league: value.league,
            season: value.season,
            participants: value.participants,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPredictionDocument {
    #[serde(rename = "_id")]
    id: String,
    pool_id: String,
    match_id: i64,
    user_id: String,
    home_goals: u8,
    away_goals: u8,
    submitted_at: i64,
}

impl From<PredictionEntity> for MongoPredictionDocument {
    fn from(value: PredictionEntity) -> Self {
        Self {
            id: prediction_id(value.pool_id, value.match_id, &value.user_id),
            pool_id: value.pool_id.to_string(),
            match_id: value.match_id,
            user_id: value.user_id,
            home_goals: value.home_goals,
            away_goals: value.away_goals,
            submitted_at: value.submitted_at,
        }
    }
}

impl TryFrom<MongoPredictionDocument> for PredictionEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoPredictionDocument) -> MongoResult<Self> {
        Ok(Self {
            pool_id: parse_uuid(&value.pool_id)?,
            match_id: value.match_id,
            user_id: value.user_id,
            home_goals: value.home_goals,
            away_goals: value.away_goals,
            submitted_at: value.submitted_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTournamentDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    country: String,
    season: String,
    start_date: String,
    end_date: String,
}

impl From<TournamentEntity> for MongoTournamentDocument {
    fn from(value: TournamentEntity) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            country: value.country,
            season: value.season,
            start_date: format_date(value.start_date),
            end_date: format_date(value.end_date),
        }
    }
}

impl TryFrom<MongoTournamentDocument> for TournamentEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoTournamentDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_uuid(&value.id)?,
            start_date: parse_date(&value.id, &value.start_date)?,
            end_date: parse_date(&value.id, &value.end_date)?,
            name: value.name,
            country: value.country,
            season: value.season,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCatalogMatchDocument {
    #[serde(rename = "_id")]
    id: String,
    tournament_id: String,
    home_team: String,
    away_team: String,
    match_date: DateTime,
    stadium: String,
    result: Option<MatchResultEntity>,
}

impl From<CatalogMatchEntity> for MongoCatalogMatchDocument {
    fn from(value: CatalogMatchEntity) -> Self {
        Self {
            id: value.id.to_string(),
            tournament_id: value.tournament_id.to_string(),
            home_team: value.home_team,
            away_team: value.away_team,
            match_date: to_bson_datetime(value.match_date),
            stadium: value.stadium,
            result: value.result,
        }
    }
}

impl TryFrom<MongoCatalogMatchDocument> for CatalogMatchEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoCatalogMatchDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_uuid(&value.id)?,
            tournament_id: parse_uuid(&value.tournament_id)?,
            match_date: from_bson_datetime(&value.id, value.match_date)?,
            home_team: value.home_team,
            away_team: value.away_team,
            stadium: value.stadium,
            result: value.result,
        })
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

pub fn prediction_id(pool_id: Uuid, match_id: i64, user_id: &str) -> String {
    format!("{pool_id}:{match_id}:{user_id}")
}

fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

fn parse_date(id: &str, raw: &str) -> MongoResult<Date> {
    Date::parse(raw, DATE_FORMAT).map_err(|err| MongoDaoError::Malformed {
        id: id.to_owned(),
        reason: format!("invalid date `{raw}`: {err}"),
    })
}

fn parse_uuid(raw: &str) -> MongoResult<Uuid> {
    Uuid::parse_str(raw).map_err(|err| MongoDaoError::Malformed {
        id: raw.to_owned(),
        reason: err.to_string(),
    })
}

fn to_bson_datetime(value: OffsetDateTime) -> DateTime {
    DateTime::from_millis((value.unix_timestamp_nanos() / 1_000_000) as i64)
}

fn from_bson_datetime(id: &str, value: DateTime) -> MongoResult<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(value.timestamp_millis()) * 1_000_000)
        .map_err(|err| MongoDaoError::Malformed {
            id: id.to_owned(),
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;

    #[test]
    fn pool_documents_keep_dates_as_plain_days() {
        let entity = PoolEntity {
            id: Uuid::new_v4(),
            name: "Office pool".into(),
            description: None,
            owner: "alice".into(),
            league: League::LaLiga,
            season: Season::new(2024).unwrap(),
            start_date: date!(2024 - 08 - 15),
            end_date: date!(2025 - 05 - 25),
            participants: vec!["alice".into()],
            created_at: datetime!(2024-08-01 09:30:00.250 UTC),
            updated_at: datetime!(2024-08-01 09:30:00.250 UTC),
        };

        let document = MongoPoolDocument::from(entity.clone());
        assert_eq!(document.start_date, "2024-08-15");
        let back = PoolEntity::try_from(document).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn malformed_dates_are_reported() {
        assert!(matches!(
            parse_date("pool", "15/08/2024"),
            Err(MongoDaoError::Malformed { .. })
        ));
    }
}

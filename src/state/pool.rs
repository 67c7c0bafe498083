//! Prediction pools: metadata, league binding and membership.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Date, OffsetDateTime};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::PoolEntity,
    state::league::{League, LeagueTable, Season},
};

/// Pool identifier.
pub type PoolId = Uuid;
/// User identifier issued by the identity provider.
pub type UserId = String;

/// Longest accepted pool name, in characters.
pub const MAX_NAME_CHARS: usize = 80;
/// Longest accepted pool description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 280;

/// Reasons a pool definition is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolValidationError {
    #[error("pool name must not be empty")]
    EmptyName,
    #[error("pool name exceeds {MAX_NAME_CHARS} characters")]
    NameTooLong,
    #[error("pool description exceeds {MAX_DESCRIPTION_CHARS} characters")]
    DescriptionTooLong,
    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: Date, end: Date },
    #[error("league `{0}` is not available")]
    UnknownLeague(League),
}

/// Derived pool status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    Active,
    Finished,
}

/// Which pools a listing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PoolFilter {
    Active,
    Finished,
    #[default]
    All,
}

impl PoolFilter {
    pub fn accepts(self, pool: &Pool, today: Date) -> bool {
        match self {
            PoolFilter::All => true,
            PoolFilter::Active => pool.status(today) == PoolStatus::Active,
            PoolFilter::Finished => pool.status(today) == PoolStatus::Finished,
        }
    }
}

/// Owner-supplied fields used to create a pool.
#[derive(Debug, Clone)]
pub struct PoolDraft {
    pub name: String,
    pub description: Option<String>,
    pub league: League,
    pub season: Season,
    pub start_date: Date,
    pub end_date: Date,
}

/// Owner-editable fields. An empty description clears it.
#[derive(Debug, Clone, Default)]
pub struct PoolChanges {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A prediction contest bound to one league and season.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub id: PoolId,
    pub name: String,
    pub description: Option<String>,
    pub owner: UserId,
    pub league: League,
    pub season: Season,
    pub start_date: Date,
    pub end_date: Date,
    /// Owner first, then members in join order.
    pub participants: Vec<UserId>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Pool {
    /// Validate `draft` and build a new pool owned by `owner`.
    pub fn create(
        owner: UserId,
        draft: PoolDraft,
        leagues: &LeagueTable,
        now: OffsetDateTime,
    ) -> Result<Self, PoolValidationError> {
        let name = validate_name(&draft.name)?;
        let description = validate_description(draft.description)?;
        if draft.end_date < draft.start_date {
            return Err(PoolValidationError::EndBeforeStart {
                start: draft.start_date,
                end: draft.end_date,
            });
        }
        if !leagues.contains(draft.league) {
            return Err(PoolValidationError::UnknownLeague(draft.league));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            description,
            participants: vec![owner.clone()],
            owner,
            league: draft.league,
            season: draft.season,
            start_date: draft.start_date,
            end_date: draft.end_date,
            created_at: now,
            updated_at: now,
        })
    }

    /// `Active` while `end_date` has not passed.
    pub fn status(&self, today: Date) -> PoolStatus {
        if self.end_date >= today {
            PoolStatus::Active
        } else {
            PoolStatus::Finished
        }
    }

    pub fn is_owner(&self, user: &str) -> bool {
        self.owner == user
    }

    pub fn is_participant(&self, user: &str) -> bool {
        self.participants.iter().any(|member| member == user)
    }

    /// Whether a kickoff falls inside the pool's date window.
    pub fn covers(&self, kickoff: OffsetDateTime) -> bool {
        let day = kickoff.date();
        day >= self.start_date && day <= self.end_date
    }

    /// Apply owner edits on a copy, leaving `self` untouched on failure.
    pub fn with_changes(
        &self,
        changes: PoolChanges,
        now: OffsetDateTime,
    ) -> Result<Self, PoolValidationError> {
        let mut next = self.clone();
        if let Some(name) = changes.name {
            next.name = validate_name(&name)?;
        }
        if let Some(description) = changes.description {
            next.description = validate_description(Some(description))?;
        }
        next.updated_at = now;
        Ok(next)
    }

    /// Copy with `user` appended to the participants, or `None` if already a member.
    pub fn with_member(&self, user: &str, now: OffsetDateTime) -> Option<Self> {
        if self.is_participant(user) {
            return None;
        }
        let mut next = self.clone();
        next.participants.push(user.to_owned());
        next.updated_at = now;
        Some(next)
    }

    /// Copy without `user`, or `None` if they are not a member.
    pub fn without_member(&self, user: &str, now: OffsetDateTime) -> Option<Self> {
        if !self.is_participant(user) {
            return None;
        }
        let mut next = self.clone();
        next.participants.retain(|member| member != user);
        next.updated_at = now;
        Some(next)
    }
}

fn validate_name(raw: &str) -> Result<String, PoolValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(PoolValidationError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(PoolValidationError::NameTooLong);
    }
    Ok(name.to_owned())
}

fn validate_description(raw: Option<String>) -> Result<Option<String>, PoolValidationError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let description = raw.trim();
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(PoolValidationError::DescriptionTooLong);
    }
    Ok((!description.is_empty()).then(|| description.to_owned()))
}

/// Sort pools by start date, then name.
pub fn sort_pools(pools: &mut [Pool]) {
    pools.sort_by(|a, b| {
        a.start_date
            .cmp(&b.start_date)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
}

impl From<PoolEntity> for Pool {
    fn from(entity: PoolEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            description: entity.description,
            owner: entity.owner,
            league: entity.league,
            season: entity.season,
            start_date: entity.start_date,
            end_date: entity.end_date,
            participants: entity.participants,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

impl From<Pool> for PoolEntity {
    fn from(pool: Pool) -> Self {
        Self {
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

/// Offline copy of the pools this process has seen, replaced record by record.
#[derive(Default)]
pub struct LocalPools {
    pools: DashMap<PoolId, Pool>,
}

impl LocalPools {
    pub fn get(&self, id: PoolId) -> Option<Pool> {
        self.pools.get(&id).map(|entry| entry.value().clone())
    }

    /// Replace the whole record for `pool.id`.
    pub fn replace(&self, pool: Pool) {
        self.pools.insert(pool.id, pool);
    }

    pub fn remove(&self, id: PoolId) -> Option<Pool> {
        self.pools.remove(&id).map(|(_, pool)| pool)
    }

    /// Pools `user` participates in.
    pub fn for_user(&self, user: &str) -> Vec<Pool> {
        self.pools
            .iter()
            .filter(|entry| entry.value().is_participant(user))
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn all(&self) -> Vec<Pool> {
        self.pools.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Drop every record and install `pools` instead.
    pub fn replace_all(&self, pools: impl IntoIterator<Item = Pool>) {
        self.pools.clear();
        for pool in pools {
            self.pools.insert(pool.id, pool);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use time::macros::{date, datetime};

    use super::*;

    pub(crate) fn draft() -> PoolDraft {
        PoolDraft {
            name: "Office pool".into(),
            description: Some("Premier League with the team".into()),
            league: League::PremierLeague,
            season: Season::new(2024).unwrap(),
            start_date: date!(2024 - 08 - 01),
            end_date: date!(2025 - 05 - 31),
        }
    }

    fn now() -> OffsetDateTime {
        datetime!(2024-07-20 10:00 UTC)
    }

    #[test]
    fn owner_is_first_participant() {
        let pool = Pool::create("alice".into(), draft(), &LeagueTable::default(), now()).unwrap();
        assert_eq!(pool.participants, vec!["alice".to_string()]);
        assert!(pool.is_owner("alice"));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut draft = draft();
        draft.end_date = date!(2024 - 07 - 01);
        let err = Pool::create("alice".into(), draft, &LeagueTable::default(), now()).unwrap_err();
        assert!(matches!(err, PoolValidationError::EndBeforeStart { .. }));
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        let mut blank = draft();
        blank.name = "   ".into();
        assert_eq!(
            Pool::create("alice".into(), blank, &LeagueTable::default(), now()),
            Err(PoolValidationError::EmptyName)
        );

        let mut long = draft();
        long.name = "x".repeat(MAX_NAME_CHARS + 1);
        assert_eq!(
            Pool::create("alice".into(), long, &LeagueTable::default(), now()),
            Err(PoolValidationError::NameTooLong)
        );
    }

    #[test]
    fn league_must_be_in_the_table() {
        let table = LeagueTable::new([]);
        assert_eq!(
            Pool::create("alice".into(), draft(), &table, now()),
            Err(PoolValidationError::UnknownLeague(League::PremierLeague))
        );
    }

    #[test]
    fn status_is_derived_from_end_date() {
        let pool = Pool::create("alice".into(), draft(), &LeagueTable::default(), now()).unwrap();
        assert_eq!(pool.status(date!(2025 - 05 - 31)), PoolStatus::Active);
        assert_eq!(pool.status(date!(2025 - 06 - 01)), PoolStatus::Finished);
        assert!(PoolFilter::Finished.accepts(&pool, date!(2025 - 06 - 01)));
        assert!(!PoolFilter::Active.accepts(&pool, date!(2025 - 06 - 01)));
    }

    #[test]
    fn membership_keeps_join_order() {
        let pool = Pool::create("alice".into(), draft(), &LeagueTable::default(), now()).unwrap();
        let pool = pool.with_member("bob", now()).unwrap();
        let pool = pool.with_member("carol", now()).unwrap();
        assert!(pool.with_member("bob", now()).is_none());
        assert_eq!(pool.participants, vec!["alice", "bob", "carol"]);

        let pool = pool.without_member("bob", now()).unwrap();
        assert_eq!(pool.participants, vec!["alice", "carol"]);
    }

    #[test]
    fn empty_description_clears_it() {
        let pool = Pool::create("alice".into(), draft(), &LeagueTable::default(), now()).unwrap();
        let changed = pool
            .with_changes(
                PoolChanges {
                    name: None,
                    description: Some(" ".into()),
                },
                now(),
            )
            .unwrap();
        assert_eq!(changed.description, None);
        assert_eq!(changed.name, pool.name);
    }

    #[test]
    fn window_is_inclusive() {
        let pool = Pool::create("alice".into(), draft(), &LeagueTable::default(), now()).unwrap();
        assert!(pool.covers(datetime!(2024-08-01 19:00 UTC)));
        assert!(pool.covers(datetime!(2025-05-31 15:00 UTC)));
        assert!(!pool.covers(datetime!(2024-07-31 19:00 UTC)));
    }
}

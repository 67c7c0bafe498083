//! Per-user session context: the profile loaded at login and dropped at logout.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::state::pool::UserId;

/// Profile data kept for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub display_name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// User-editable profile fields. Empty strings clear optional fields.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub address: Option<String>,
}

/// Saved profiles plus the set of users with an active session.
#[derive(Default)]
pub struct SessionRegistry {
    profiles: DashMap<UserId, UserProfile>,
    active: DashMap<UserId, OffsetDateTime>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load (or create) the profile of `user_id` and mark the session active.
    ///
    /// A blank `display_name` keeps the saved one; the email is always refreshed.
    pub fn login(
        &self,
        user_id: &str,
        display_name: &str,
        email: &str,
        now: OffsetDateTime,
    ) -> UserProfile {
        let display_name = display_name.trim();
        let profile = {
            let mut entry = self
                .profiles
                .entry(user_id.to_owned())
                .or_insert_with(|| UserProfile {
                    user_id: user_id.to_owned(),
                    display_name: display_name.to_owned(),
                    email: email.to_owned(),
                    avatar: None,
                    address: None,
                });
            if !display_name.is_empty() {
                entry.display_name = display_name.to_owned();
            }
            entry.email = email.to_owned();
            entry.clone()
        };
        self.active.insert(user_id.to_owned(), now);
        profile
    }

    /// Deactivate the session. The profile stays saved.
    pub fn logout(&self, user_id: &str) -> bool {
        self.active.remove(user_id).is_some()
    }

    pub fn is_active(&self, user_id: &str) -> bool {
        self.active.contains_key(user_id)
    }

    pub fn profile(&self, user_id: &str) -> Option<UserProfile> {
        self.profiles.get(user_id).map(|entry| entry.value().clone())
    }

    /// Apply `changes` to a saved profile.
    pub fn update(&self, user_id: &str, changes: ProfileChanges) -> Option<UserProfile> {
        let mut entry = self.profiles.get_mut(user_id)?;
        if let Some(name) = changes.display_name {
            let name = name.trim();
            if !name.is_empty() {
                entry.display_name = name.to_owned();
            }
        }
        if let Some(avatar) = changes.avatar {
            entry.avatar = non_blank(avatar);
        }
        if let Some(address) = changes.address {
            entry.address = non_blank(address);
        }
        Some(entry.clone())
    }

    /// Every saved profile, for persistence.
    pub fn profiles(&self) -> Vec<UserProfile> {
        let mut profiles: Vec<UserProfile> = self
            .profiles
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        profiles.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        profiles
    }

    /// Install profiles loaded from disk without activating any session.
    pub fn restore(&self, profiles: impl IntoIterator<Item = UserProfile>) {
        for profile in profiles {
            self.profiles.insert(profile.user_id.clone(), profile);
        }
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

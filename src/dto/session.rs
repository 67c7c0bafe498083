use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::validation::validate_user_id,
    state::session::{ProfileChanges, UserProfile},
};

/// Sent once the identity provider authenticated the user.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(custom(function = "validate_user_id"))]
    pub user_id: String,
    #[serde(default)]
    #[validate(length(max = 80))]
    pub display_name: String,
    #[validate(email)]
    pub email: String,
}

/// Editable profile fields. Blank avatar or address clears the value.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 80))]
    pub display_name: Option<String>,
    /// Reference to the stored avatar image.
    #[serde(default)]
    #[validate(length(max = 512))]
    pub avatar: Option<String>,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub address: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileChanges {
    fn from(value: UpdateProfileRequest) -> Self {
        Self {
            display_name: value.display_name,
            avatar: value.avatar,
            address: value.address,
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub address: Option<String>,
}

impl From<UserProfile> for ProfileResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            user_id: profile.user_id,
            display_name: profile.display_name,
            email: profile.email,
            avatar: profile.avatar,
            address: profile.address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_requires_an_email() {
        let request = LoginRequest {
            user_id: "u1".into(),
            display_name: "Ana".into(),
            email: "not-an-email".into(),
        };
        assert!(request.validate().is_err());
    }
}

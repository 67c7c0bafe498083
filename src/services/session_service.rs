use tracing::info;

use crate::{
    dto::session::{LoginRequest, ProfileResponse, UpdateProfileRequest},
    error::ServiceError,
    services::snapshot_service,
    state::{SharedState, timestamp_now},
};

/// Activate a session for a user the identity provider already authenticated.
pub async fn login(
    state: &SharedState,
    request: LoginRequest,
) -> Result<ProfileResponse, ServiceError> {
    let profile = state.sessions().login(
        &request.user_id,
        &request.display_name,
        &request.email,
        timestamp_now(),
    );
    info!(user_id = %profile.user_id, "session started");
    snapshot_service::persist(state).await;
    Ok(profile.into())
}

pub fn logout(state: &SharedState, user_id: &str) -> bool {
    let ended = state.sessions().logout(user_id);
    if ended {
        info!(user_id, "session ended");
    }
    ended
}

pub fn profile(state: &SharedState, user_id: &str) -> Result<ProfileResponse, ServiceError> {
    state
        .sessions()
        .profile(user_id)
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("profile `{user_id}` not found")))
}

pub async fn update_profile(
    state: &SharedState,
    user_id: &str,
    request: UpdateProfileRequest,
) -> Result<ProfileResponse, ServiceError> {
    let profile = state
        .sessions()
        .update(user_id, request.into())
        .ok_or_else(|| ServiceError::NotFound(format!("profile `{user_id}` not found")))?;
    snapshot_service::persist(state).await;
    Ok(profile.into())
}

/// Fail with [`ServiceError::Unauthorized`] unless `user_id` has an active session.
pub fn require_session(state: &SharedState, user_id: &str) -> Result<(), ServiceError> {
    if state.sessions().is_active(user_id) {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized(format!(
            "no active session for `{user_id}`"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::memory_state;

    fn ana() -> LoginRequest {
        LoginRequest {
            user_id: "ana".into(),
            display_name: "Ana".into(),
            email: "ana@example.com".into(),
        }
    }

    #[tokio::test]
    async fn sessions_gate_access() {
        let (state, _store) = memory_state().await;
        assert!(matches!(
            require_session(&state, "ana"),
            Err(ServiceError::Unauthorized(_))
        ));

        login(&state, ana()).await.unwrap();
        assert!(require_session(&state, "ana").is_ok());

        assert!(logout(&state, "ana"));
        assert!(require_session(&state, "ana").is_err());
        assert!(profile(&state, "ana").is_ok());
    }

    #[tokio::test]
    async fn profile_edits_survive_a_new_login() {
        let (state, _store) = memory_state().await;
        login(&state, ana()).await.unwrap();
        update_profile(
            &state,
            "ana",
            UpdateProfileRequest {
                address: Some("Calle 10 # 43-12, Medellín".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        logout(&state, "ana");

        let again = login(
            &state,
            LoginRequest {
                display_name: String::new(),
                ..ana()
            },
        )
        .await
        .unwrap();
        assert_eq!(again.display_name, "Ana");
        assert_eq!(again.address.as_deref(), Some("Calle 10 # 43-12, Medellín"));
    }
}

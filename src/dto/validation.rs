//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest user id accepted from the identity provider.
pub const MAX_USER_ID_CHARS: usize = 128;

/// Validates a user id handed over by the identity provider: non-empty, no whitespace,
/// at most [`MAX_USER_ID_CHARS`] characters.
///
/// # Examples
///
/// ```ignore
/// validate_user_id("auth0|64f1c2") // Ok
/// validate_user_id("ana maria")    // Err - whitespace
/// validate_user_id("")             // Err - empty
/// ```
pub fn validate_user_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.chars().count() > MAX_USER_ID_CHARS {
        let mut err = ValidationError::new("user_id_length");
        err.message = Some(
            format!(
                "User ID must be between 1 and {MAX_USER_ID_CHARS} characters (got {})",
                id.chars().count()
            )
            .into(),
        );
        return Err(err);
    }

    if id.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("user_id_format");
        err.message = Some("User ID must not contain whitespace".into());
        return Err(err);
    }

    Ok(())
}

/// Rejects strings made only of whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_user_id_valid() {
        assert!(validate_user_id("auth0|64f1c2").is_ok());
        assert!(validate_user_id("u1").is_ok());
        assert!(validate_user_id(&"a".repeat(MAX_USER_ID_CHARS)).is_ok());
    }

    #[test]
    fn test_validate_user_id_invalid() {
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id("ana maria").is_err());
        assert!(validate_user_id(&"a".repeat(MAX_USER_ID_CHARS + 1)).is_err());
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Estadio").is_ok());
        assert!(validate_not_blank("   ").is_err());
    }
}

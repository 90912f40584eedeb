//! Validation helpers for DTOs.

use validator::ValidationError;

/// Maximum number of characters a nickname may contain.
pub const NICKNAME_MAX_CHARS: usize = 20;

/// Validates that a nickname is non-blank, printable, and at most
/// [`NICKNAME_MAX_CHARS`] characters.
pub fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    if nickname.trim().is_empty() {
        let mut err = ValidationError::new("nickname_blank");
        err.message = Some("Nickname must not be blank".into());
        return Err(err);
    }

    if nickname.chars().count() > NICKNAME_MAX_CHARS {
        let mut err = ValidationError::new("nickname_length");
        err.message =
            Some(format!("Nickname must be at most {NICKNAME_MAX_CHARS} characters").into());
        return Err(err);
    }

    if nickname.chars().any(char::is_control) {
        let mut err = ValidationError::new("nickname_format");
        err.message = Some("Nickname must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

use garde::Validate;

use crate::error::{AppError, Result};

/// Runs the `garde` rules declared on a request payload.
pub fn validate_payload<T>(payload: &T) -> Result<()>
where
    T: Validate,
    T::Context: Default,
{
    payload
        .validate()
        .map_err(|report| AppError::Validation(report.to_string()))
}

/// Validates an optional username.
///
/// # Arguments
///
/// * `username` - The username to validate, if one was supplied.
///
/// # Returns
///
/// A `Result<()>` indicating whether the username is valid.
pub fn validate_username(username: Option<&str>) -> Result<()> {
    let Some(username) = username else {
        return Ok(());
    };

    if username.chars().count() < 3 {
        return Err(AppError::Validation(
            "Username must be at least 3 characters long".to_string(),
        ));
    }

    if username.chars().count() > 255 {
        return Err(AppError::Validation(
            "Username must be at most 255 characters".to_string(),
        ));
    }

    if !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(AppError::Validation(
            "Username can only contain letters, numbers, underscores, and hyphens".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Probe {
        #[garde(email)]
        email: String,
        #[garde(length(min = 8, max = 128))]
        password: String,
    }

    #[test]
    fn usernames() {
        assert!(validate_username(None).is_ok());
        assert!(validate_username(Some("alice_01")).is_ok());
        assert!(validate_username(Some("al")).is_err());
        assert!(validate_username(Some("alice smith")).is_err());
        assert!(validate_username(Some(&"a".repeat(256))).is_err());
    }

    #[test]
    fn garde_report_becomes_validation_error() {
        let ok = Probe {
            email: "alice@example.com".to_string(),
            password: "long enough".to_string(),
        };
        assert!(validate_payload(&ok).is_ok());

        let bad = Probe {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
        };
        assert!(matches!(validate_payload(&bad), Err(AppError::Validation(_))));
    }
}

//! Password complexity rule applied at registration.
//!
//! The rule is intentionally small: at least one upper-case and one
//! lower-case code point. Length limits are enforced by request validation.

use crate::error::CoreError;

/// Message returned when the password fails the complexity rule.
pub const PASSWORD_CASE_MESSAGE: &str = "password must contain at least one upper and lower case";

/// Check that `password` contains at least one upper-case and one lower-case
/// character. Uses Unicode case properties, so `"ÄÖ"`-style scripts count.
pub fn validate_password_complexity(password: &str) -> Result<(), CoreError> {
    let has_upper = password.chars().any(char::is_uppercase);
    let has_lower = password.chars().any(char::is_lowercase);

    if !has_upper || !has_lower {
        return Err(CoreError::Validation(PASSWORD_CASE_MESSAGE.to_string()));
    }
    Ok(())
}

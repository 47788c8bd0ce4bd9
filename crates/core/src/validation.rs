//! Request field validation helpers.
//!
//! Handlers call these before touching the database so malformed input is
//! rejected with [`CoreError::Validation`] (HTTP 400).

use uuid::Uuid;
use validator::ValidateEmail;

use crate::error::CoreError;

/// Minimum password length accepted on change-password.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Return the trimmed value, or a validation error naming the field.
pub fn require_field<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, CoreError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(CoreError::Validation(format!("{field} is required"))),
    }
}

/// Parse a UUID supplied as a string field.
pub fn parse_uuid(field: &str, value: &str) -> Result<Uuid, CoreError> {
    Uuid::parse_str(value.trim())
        .map_err(|_| CoreError::Validation(format!("Invalid {field} format: must be a valid UUID")))
}

/// Validate and lowercase an email address.
pub fn normalize_email(value: &str) -> Result<String, CoreError> {
    let email = value.trim().to_lowercase();
    if !email.validate_email() {
        return Err(CoreError::Validation(format!(
            "'{value}' is not a valid email address"
        )));
    }
    Ok(email)
}

/// Normalize a phone number to digits, keeping an international `+` prefix.
///
/// `00` international prefixes are rewritten to `+`. Numbers must have
/// between 7 and 15 digits.
pub fn normalize_phone(value: &str) -> Result<String, CoreError> {
    let trimmed = value.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    let (international, digits) = if trimmed.starts_with('+') {
        (true, digits)
    } else if let Some(rest) = digits.strip_prefix("00") {
        (true, rest.to_string())
    } else {
        (false, digits)
    };

    if !(7..=15).contains(&digits.len()) {
        return Err(CoreError::Validation(format!(
            "'{value}' is not a valid phone number"
        )));
    }
    Ok(if international {
        format!("+{digits}")
    } else {
        digits
    })
}

/// Validate a new password's length.
pub fn validate_new_password(password: &str) -> Result<(), CoreError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::Validation(format!(
            "New password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

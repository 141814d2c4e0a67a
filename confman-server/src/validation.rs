//! Request field validation
//!
//! Each check returns a 400 naming the offending field.

use crate::error::{ApiError, ApiResult};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 32;
pub const PASSWORD_MIN: usize = 6;
pub const PHONE_MIN: usize = 4;
pub const PHONE_MAX: usize = 20;

pub fn username(value: &str) -> ApiResult<()> {
    let len = value.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(ApiError::validation(
            "username",
            format!("username must be {}-{} characters", USERNAME_MIN, USERNAME_MAX),
        ));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(ApiError::validation(
            "username",
            "username may only contain letters, digits, '_', '.' and '-'",
        ));
    }
    Ok(())
}

pub fn email(value: &str) -> ApiResult<()> {
    let invalid = || ApiError::validation("email", "email address is not valid");

    let (local, domain) = value.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || value.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    // Dotted domain with no empty labels
    if !domain.contains('.') || domain.split('.').any(str::is_empty) {
        return Err(invalid());
    }
    Ok(())
}

pub fn password(value: &str) -> ApiResult<()> {
    if value.chars().count() < PASSWORD_MIN {
        return Err(ApiError::validation(
            "password",
            format!("password must be at least {} characters", PASSWORD_MIN),
        ));
    }
    Ok(())
}

pub fn phone(value: &str) -> ApiResult<()> {
    let len = value.chars().count();
    let well_formed = (PHONE_MIN..=PHONE_MAX).contains(&len)
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-'))
        && value.chars().any(|c| c.is_ascii_digit());

    if well_formed {
        Ok(())
    } else {
        Err(ApiError::validation("phone", "phone number is not valid"))
    }
}

/// Required free-text field
pub fn non_blank(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        Err(ApiError::validation(field, format!("{} is required", field)))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: ApiResult<()>) -> Option<String> {
        match result {
            Err(ApiError::Validation { field, .. }) => field,
            _ => None,
        }
    }

    #[test]
    fn test_username() {
        assert!(username("alice").is_ok());
        assert!(username("a.b-c_1").is_ok());
        assert_eq!(field_of(username("al")).as_deref(), Some("username"));
        assert!(username("has space").is_err());
        assert!(username(&"x".repeat(33)).is_err());
    }

    #[test]
    fn test_email() {
        assert!(email("alice@x.com").is_ok());
        assert!(email("a.b+tag@sub.example.org").is_ok());
        for bad in ["alice", "@x.com", "alice@x", "alice@x..com", "a@b@c.com", "a lice@x.com"] {
            assert!(email(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_password_and_phone() {
        assert!(password("secret1").is_ok());
        assert!(password("short").is_err());

        assert!(phone("+1555").is_ok());
        assert!(phone("+44 20 7946-0958").is_ok());
        assert!(phone("+1").is_err());
        assert!(phone("call me").is_err());
        assert!(phone("+ - +").is_err());
    }

    #[test]
    fn test_non_blank() {
        assert!(non_blank("feedback", "Solid").is_ok());
        assert_eq!(field_of(non_blank("feedback", "   ")).as_deref(), Some("feedback"));
    }
}

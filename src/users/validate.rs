use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ApiError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if !is_valid_email(email) {
        return Err(ApiError::Validation("email is invalid".into()));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".into()));
    }
    Ok(())
}

/// At least 8 characters and must not contain the word "password" in any
/// casing.
pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    if password.to_lowercase().contains("password") {
        return Err(ApiError::Validation(
            "password must not contain the word \"password\"".into(),
        ));
    }
    Ok(())
}

pub fn validate_age(age: i64) -> Result<(), ApiError> {
    if age < 0 {
        return Err(ApiError::Validation("age must not be negative".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_emails() {
        assert!(is_valid_email("kate@example.com"));
        assert!(is_valid_email("first.last+tag@sub.domain.io"));
    }

    #[test]
    fn rejects_malformed_emails() {
        for bad in [
            "",
            "plain",
            "no-at.example.com",
            "two@@example.com",
            "a b@example.com",
            "user@nodot",
        ] {
            assert!(!is_valid_email(bad), "{bad:?} should be invalid");
        }
    }

    #[test]
    fn name_must_have_visible_characters() {
        assert!(validate_name("Kate").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn password_length_is_enforced() {
        assert!(validate_password("short7!").is_err());
        assert!(validate_password("exactly8").is_ok());
    }

    #[test]
    fn password_must_not_contain_the_word_password() {
        assert!(validate_password("password123").is_err());
        assert!(validate_password("MyPaSsWoRd!").is_err());
        assert!(validate_password("xxPASSWORDxx").is_err());
        assert!(validate_password("correct-horse-battery").is_ok());
    }

    #[test]
    fn age_must_be_non_negative() {
        assert!(validate_age(0).is_ok());
        assert!(validate_age(42).is_ok());
        assert!(validate_age(-1).is_err());
    }

    #[test]
    fn validation_errors_name_the_field() {
        let err = validate_password("short").unwrap_err();
        assert!(err.to_string().contains("password"));
        let err = validate_age(-5).unwrap_err();
        assert!(err.to_string().contains("age"));
    }
}

//! Request Validation
//!
//! Declarative structural validation for inbound requests. Field validators
//! return a single [`ValidationError`]; the [`Validate`] trait aggregates —
//! a request with several defects reports one message per violated rule, not
//! just the first.
//!
//! # Usage
//!
//! ```ignore
//! use portcullis::validation::{collect, validate_email, validate_required, Validate, ValidationError};
//!
//! struct SignUp {
//!     email: String,
//!     password: String,
//! }
//!
//! impl Validate for SignUp {
//!     fn validate(&self) -> Result<(), Vec<ValidationError>> {
//!         let mut errors = Vec::new();
//!         collect(&mut errors, validate_required(&self.email, "email"));
//!         collect(&mut errors, validate_email(&self.email));
//!         collect(&mut errors, validate_required(&self.password, "password"));
//!         if errors.is_empty() { Ok(()) } else { Err(errors) }
//!     }
//! }
//! ```

use std::fmt;

/// Validation error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field that failed validation (if applicable)
    pub field: Option<String>,
    /// Error code for programmatic handling
    pub code: ValidationErrorCode,
    /// Human-readable message
    pub message: String,
}

impl ValidationError {
    /// Create a validation error without field context.
    pub fn new(code: ValidationErrorCode, message: impl Into<String>) -> Self {
        Self {
            field: None,
            code,
            message: message.into(),
        }
    }

    /// Create a validation error for a specific field.
    pub fn for_field(
        field: impl Into<String>,
        code: ValidationErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: Some(field.into()),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}", field, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validation error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// Value is required but missing/empty
    Required,
    /// Value is too short
    TooShort,
    /// Value is too long
    TooLong,
    /// Email format is invalid
    InvalidEmail,
    /// Two fields that must match do not
    Mismatch,
}

impl fmt::Display for ValidationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::TooShort => write!(f, "too_short"),
            Self::TooLong => write!(f, "too_long"),
            Self::InvalidEmail => write!(f, "invalid_email"),
            Self::Mismatch => write!(f, "mismatch"),
        }
    }
}

/// Trait for validatable request types.
///
/// Implementations report every violated rule.
pub trait Validate {
    /// Validate the instance, returning all violations.
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Check if the instance is valid (convenience method).
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Push the error from a failed check onto the aggregate list.
pub fn collect(errors: &mut Vec<ValidationError>, result: Result<(), ValidationError>) {
    if let Err(e) = result {
        errors.push(e);
    }
}

// ============================================================================
// Field validators
// ============================================================================

/// Validate that a string is not empty or whitespace-only.
pub fn validate_required(value: &str, field: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::Required,
            format!("{} is required.", capitalize(field)),
        ));
    }
    Ok(())
}

/// Validate string length bounds (inclusive, counted in characters).
pub fn validate_length(
    value: &str,
    min: usize,
    max: usize,
    field: &str,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::TooShort,
            format!("{} must be at least {} characters.", capitalize(field), min),
        ));
    }
    if len > max {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::TooLong,
            format!("{} must be at most {} characters.", capitalize(field), max),
        ));
    }
    Ok(())
}

/// Validate an email address against common RFC-5322-ish rules.
///
/// Accepted shape: a local part of letters, digits, and the usual atom
/// specials (no leading/trailing dot, no consecutive dots), one `@`, and a
/// dotted domain whose labels are alphanumeric/hyphen with an alphabetic
/// top-level label of 2–63 characters.
pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    let invalid =
        || ValidationError::for_field("email", ValidationErrorCode::InvalidEmail, "Invalid email address.");

    let Some((local, domain)) = value.split_once('@') else {
        return Err(invalid());
    };

    // Local part
    if local.is_empty() || local.len() > 64 {
        return Err(invalid());
    }
    if !local.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        || !local.chars().last().is_some_and(|c| c.is_ascii_alphanumeric())
    {
        return Err(invalid());
    }
    if local.contains("..") {
        return Err(invalid());
    }
    const LOCAL_SPECIALS: &str = "!#$%&'*+/=?^`{}|~._-";
    if !local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || LOCAL_SPECIALS.contains(c))
    {
        return Err(invalid());
    }

    // Domain
    if domain.is_empty() || domain.len() > 255 || domain.contains('@') || !domain.contains('.') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    for label in &labels {
        if label.is_empty()
            || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            || label.starts_with('-')
            || label.ends_with('-')
        {
            return Err(invalid());
        }
    }
    let tld = labels[labels.len() - 1];
    if tld.len() < 2 || tld.len() > 63 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }

    Ok(())
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert!(validate_required("value", "field").is_ok());
        assert!(validate_required("", "field").is_err());
        assert!(validate_required("   ", "field").is_err());

        let err = validate_required("", "password").unwrap_err();
        assert_eq!(err.code, ValidationErrorCode::Required);
        assert_eq!(err.message, "Password is required.");
    }

    #[test]
    fn test_validate_length() {
        assert!(validate_length("abcdef", 6, 10, "password").is_ok());
        assert!(matches!(
            validate_length("abcde", 6, 10, "password"),
            Err(ValidationError { code: ValidationErrorCode::TooShort, .. })
        ));
        assert!(matches!(
            validate_length("abcdefghijk", 6, 10, "password"),
            Err(ValidationError { code: ValidationErrorCode::TooLong, .. })
        ));
    }

    #[test]
    fn test_validate_email_accepts_common_addresses() {
        for email in [
            "user@example.com",
            "first.last@example.co.uk",
            "user+tag@sub.example.com",
            "u_123@example.io",
            "o'brien@example.org",
        ] {
            assert!(validate_email(email).is_ok(), "{email} should be valid");
        }
    }

    #[test]
    fn test_validate_email_rejects_malformed_addresses() {
        for email in [
            "",
            "plainaddress",
            "@example.com",
            "user@",
            "user@@example.com",
            ".user@example.com",
            "user.@example.com",
            "us..er@example.com",
            "user@example",
            "user@-example.com",
            "user@example.c",
            "user@example.123",
            "user@exa mple.com",
        ] {
            assert!(validate_email(email).is_err(), "{email} should be invalid");
        }
    }

    #[test]
    fn test_collect_aggregates() {
        let mut errors = Vec::new();
        collect(&mut errors, validate_required("", "email"));
        collect(&mut errors, validate_required("", "password"));
        collect(&mut errors, validate_required("fine", "username"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_display_includes_field() {
        let err = ValidationError::for_field("email", ValidationErrorCode::InvalidEmail, "Invalid email address.");
        assert_eq!(err.to_string(), "email: Invalid email address.");
    }
}

//! Request and response types for the account service.

use serde::{Deserialize, Serialize};

use crate::validation::{
    collect, validate_email, validate_required, Validate, ValidationError, ValidationErrorCode,
};

/// Registration request.
///
/// The username is optional; the account service falls back to the email
/// when it is absent. The confirmation field is likewise optional — when
/// present it must match the password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    pub password: String,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

impl Validate for RegistrationRequest {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        collect(&mut errors, validate_required(&self.email, "email"));
        if !self.email.trim().is_empty() {
            collect(&mut errors, validate_email(&self.email));
        }
        collect(&mut errors, validate_required(&self.password, "password"));
        if let Some(confirm) = &self.confirm_password {
            if confirm != &self.password {
                errors.push(ValidationError::for_field(
                    "confirm_password",
                    ValidationErrorCode::Mismatch,
                    "Passwords do not match.",
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Login request. At least one of email/username must be present; the
/// account service gives the email precedence when both are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Some(email) = &self.email {
            if !email.is_empty() {
                collect(&mut errors, validate_email(email));
            }
        }
        collect(&mut errors, validate_required(&self.password, "password"));

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Confirmation of a successful registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub email: String,
}

/// A successful login: the issued token and its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(email: &str, password: &str, confirm: Option<&str>) -> RegistrationRequest {
        RegistrationRequest {
            email: email.into(),
            username: None,
            password: password.into(),
            confirm_password: confirm.map(Into::into),
        }
    }

    #[test]
    fn test_valid_registration() {
        let request = registration("test@gmail.com", "test123", Some("test123"));
        assert!(request.is_valid());
    }

    #[test]
    fn test_registration_without_confirmation_is_valid() {
        let request = registration("test@gmail.com", "test123", None);
        assert!(request.is_valid());
    }

    #[test]
    fn test_registration_aggregates_all_violations() {
        let request = registration("", "", None);
        let errors = request.validate().unwrap_err();
        // Missing email AND missing password, reported together.
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.field.as_deref() == Some("email")));
        assert!(errors.iter().any(|e| e.field.as_deref() == Some("password")));
    }

    #[test]
    fn test_registration_rejects_mismatched_confirmation() {
        let request = registration("test@gmail.com", "test123", Some("incorrect password"));
        let errors = request.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ValidationErrorCode::Mismatch);
        assert_eq!(errors[0].message, "Passwords do not match.");
    }

    #[test]
    fn test_registration_rejects_bad_email() {
        let request = registration("not-an-email", "test123", None);
        let errors = request.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.code == ValidationErrorCode::InvalidEmail));
    }

    #[test]
    fn test_login_requires_password() {
        let request = LoginRequest {
            email: Some("test@gmail.com".into()),
            username: None,
            password: String::new(),
        };
        let errors = request.validate().unwrap_err();
        assert_eq!(errors[0].code, ValidationErrorCode::Required);
    }

    #[test]
    fn test_login_validates_email_format_when_present() {
        let request = LoginRequest {
            email: Some("broken@".into()),
            username: None,
            password: "test123".into(),
        };
        assert!(!request.is_valid());
    }

    #[test]
    fn test_login_with_username_only_is_valid() {
        let request = LoginRequest {
            email: None,
            username: Some("testington".into()),
            password: "test123".into(),
        };
        assert!(request.is_valid());
    }
}

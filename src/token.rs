//! JWT Issuance and Validation
//!
//! Issues and validates HMAC-SHA256 signed, time-bound tokens from a
//! [`TokenPolicy`]. The service is stateless: every call is a pure function
//! of (input, policy, wall clock), and validating the same token twice gives
//! the same answer — tokens are not consumed.
//!
//! Failure causes map to a machine-readable [`SecurityError`] so callers can
//! branch (e.g. trigger a refresh flow on [`SecurityError::ExpiredToken`])
//! without string matching. Issuer/audience/signature/structural failures
//! all collapse into the deliberately generic
//! [`SecurityError::InvalidToken`] so a caller cannot probe which check
//! rejected a forged token.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde_json::Value;

use crate::policy::TokenPolicy;

/// A single (name, value) claim embedded in a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub name: String,
    pub value: String,
}

impl Claim {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The standard subject claim.
    pub fn subject(value: impl Into<String>) -> Self {
        Self::new("sub", value)
    }
}

/// Machine-readable kind attached to every token failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityError {
    /// Signature, structure, issuer, audience, or other content check failed
    InvalidToken,
    /// Signature was valid but the token is past its lifetime
    ExpiredToken,
    /// The service is missing required configuration (no signing secret)
    InvalidConfiguration,
    /// A fault that is not a normal validation outcome
    UnexpectedError,
}

impl fmt::Display for SecurityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken => write!(f, "invalid_token"),
            Self::ExpiredToken => write!(f, "expired_token"),
            Self::InvalidConfiguration => write!(f, "invalid_configuration"),
            Self::UnexpectedError => write!(f, "unexpected_error"),
        }
    }
}

/// Token operation failure: a [`SecurityError`] kind plus ordered
/// human-readable messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenError {
    pub kind: SecurityError,
    pub messages: Vec<String>,
}

impl TokenError {
    pub fn new(kind: SecurityError, message: impl Into<String>) -> Self {
        Self {
            kind,
            messages: vec![message.into()],
        }
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.messages.join(", "))
    }
}

impl std::error::Error for TokenError {}

/// Outcome of token issuance.
pub type TokenResult = Result<String, TokenError>;

/// Outcome of token validation.
pub type TokenValidationResult = Result<(), TokenError>;

/// Issues and validates signed, time-bound tokens.
#[derive(Debug, Clone)]
pub struct TokenService {
    policy: TokenPolicy,
}

impl TokenService {
    pub fn new(policy: TokenPolicy) -> Self {
        Self { policy }
    }

    /// The policy this service was configured with.
    pub fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    /// Generate a signed token carrying the given claims, expiring
    /// `expires_in_minutes` from now.
    pub fn generate_token(&self, claims: &[Claim]) -> TokenResult {
        let expires_at = Utc::now() + Duration::minutes(self.policy.expires_in_minutes());
        self.generate_token_expiring_at(claims, expires_at)
    }

    /// Generate a signed token with an explicit expiry instant.
    pub fn generate_token_expiring_at(
        &self,
        claims: &[Claim],
        expires_at: DateTime<Utc>,
    ) -> TokenResult {
        let Some(secret) = self.policy.secret() else {
            return Err(TokenError::new(
                SecurityError::InvalidConfiguration,
                "No signing secret is configured.",
            ));
        };

        let mut payload = serde_json::Map::new();
        for claim in claims {
            payload.insert(claim.name.clone(), Value::String(claim.value.clone()));
        }
        if self.policy.validate_issuer() {
            payload.insert("iss".into(), Value::String(self.policy.issuer().into()));
        }
        if self.policy.validate_audience() {
            payload.insert("aud".into(), Value::String(self.policy.audience().into()));
        }
        payload.insert("iat".into(), Value::from(Utc::now().timestamp()));
        payload.insert("exp".into(), Value::from(expires_at.timestamp()));

        encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| {
            TokenError::new(
                SecurityError::UnexpectedError,
                format!("Failed to sign token: {}.", e),
            )
        })
    }

    /// Cryptographically verify a token and check its lifetime, issuer, and
    /// audience per the policy.
    pub fn validate_token(&self, token: &str) -> TokenValidationResult {
        let Some(secret) = self.policy.secret() else {
            return Err(TokenError::new(
                SecurityError::InvalidConfiguration,
                "No signing secret is configured.",
            ));
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.policy.clock_skew().num_seconds().max(0) as u64;
        validation.validate_exp = true;
        if self.policy.validate_issuer() {
            validation.set_issuer(&[self.policy.issuer()]);
        }
        if self.policy.validate_audience() {
            validation.set_audience(&[self.policy.audience()]);
        } else {
            validation.validate_aud = false;
        }

        match decode::<serde_json::Map<String, Value>>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        ) {
            Ok(_) => Ok(()),
            Err(e) => Err(Self::map_decode_error(e)),
        }
    }

    fn map_decode_error(error: jsonwebtoken::errors::Error) -> TokenError {
        match error.kind() {
            ErrorKind::ExpiredSignature => TokenError::new(
                SecurityError::ExpiredToken,
                "The token has expired.",
            ),
            // Collapse all content/structure failures into one generic kind
            // so a caller cannot probe which check rejected the token.
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::ImmatureSignature
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidSubject
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => {
                TokenError::new(SecurityError::InvalidToken, "The token is invalid.")
            }
            _ => TokenError::new(
                SecurityError::UnexpectedError,
                format!("Token validation failed: {}.", error),
            ),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Authentication Policy Configuration
//!
//! Validated, always-consistent policy objects governing password strength,
//! account lockout, and token issuance. Every mutating setter re-applies its
//! clamp or derivation rule immediately, so an invalid policy is never
//! observable — there is no separate validation pass to forget.
//!
//! Policies are plain values: the embedding application builds them once at
//! startup (from [`PolicyOptions`] or a builder) and hands them to the
//! services by value. No ambient/static configuration state exists.
//!
//! # Usage
//!
//! ```ignore
//! use portcullis::policy::{LockoutPolicy, PasswordPolicy, TokenPolicy};
//!
//! let password = PasswordPolicy::builder()
//!     .required_length(10)
//!     .require_non_alphanumeric(true)
//!     .build();
//!
//! let lockout = LockoutPolicy::builder()
//!     .max_failed_access_attempts(5)
//!     .default_lockout_in_minutes(15)
//!     .build();
//! assert!(lockout.enabled());
//! ```

use chrono::Duration;
use serde::Deserialize;

// ============================================================================
// Password Policy
// ============================================================================

/// Password strength rules applied at registration.
///
/// `required_length` never drops below 4 and `required_unique_chars` always
/// stays within `[2, required_length]`; both invariants are re-applied on
/// every set, whichever field changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    require_digit: bool,
    require_lowercase: bool,
    require_uppercase: bool,
    require_non_alphanumeric: bool,
    required_length: usize,
    required_unique_chars: usize,
}

impl PasswordPolicy {
    /// Hard floor for `required_length`.
    const LENGTH_MIN: usize = 4;
    /// Hard floor for `required_unique_chars`.
    const UNIQUE_MIN: usize = 2;

    /// Create a new builder.
    pub fn builder() -> PasswordPolicyBuilder {
        PasswordPolicyBuilder::default()
    }

    pub fn require_digit(&self) -> bool {
        self.require_digit
    }

    pub fn require_lowercase(&self) -> bool {
        self.require_lowercase
    }

    pub fn require_uppercase(&self) -> bool {
        self.require_uppercase
    }

    pub fn require_non_alphanumeric(&self) -> bool {
        self.require_non_alphanumeric
    }

    pub fn required_length(&self) -> usize {
        self.required_length
    }

    pub fn required_unique_chars(&self) -> usize {
        self.required_unique_chars
    }

    pub fn set_require_digit(&mut self, value: bool) {
        self.require_digit = value;
    }

    pub fn set_require_lowercase(&mut self, value: bool) {
        self.require_lowercase = value;
    }

    pub fn set_require_uppercase(&mut self, value: bool) {
        self.require_uppercase = value;
    }

    pub fn set_require_non_alphanumeric(&mut self, value: bool) {
        self.require_non_alphanumeric = value;
    }

    /// Set the minimum password length, clamped to at least 4.
    ///
    /// Shrinking the length also re-clamps `required_unique_chars` so it can
    /// never exceed the length.
    pub fn set_required_length(&mut self, value: i32) {
        self.required_length = if value > Self::LENGTH_MIN as i32 {
            value as usize
        } else {
            Self::LENGTH_MIN
        };
        self.required_unique_chars = self
            .required_unique_chars
            .clamp(Self::UNIQUE_MIN, self.required_length);
    }

    /// Set the minimum number of distinct characters, clamped to
    /// `[2, required_length]`.
    pub fn set_required_unique_chars(&mut self, value: i32) {
        let clamped = i64::from(value).clamp(Self::UNIQUE_MIN as i64, self.required_length as i64);
        self.required_unique_chars = clamped as usize;
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            require_digit: true,
            require_lowercase: true,
            require_uppercase: true,
            require_non_alphanumeric: false,
            required_length: 6,
            required_unique_chars: 2,
        }
    }
}

/// Builder for [`PasswordPolicy`]. Goes through the clamping setters, so the
/// built policy is valid no matter what was passed in.
#[derive(Debug, Clone, Default)]
pub struct PasswordPolicyBuilder {
    policy: PasswordPolicy,
}

impl PasswordPolicyBuilder {
    pub fn require_digit(mut self, value: bool) -> Self {
        self.policy.set_require_digit(value);
        self
    }

    pub fn require_lowercase(mut self, value: bool) -> Self {
        self.policy.set_require_lowercase(value);
        self
    }

    pub fn require_uppercase(mut self, value: bool) -> Self {
        self.policy.set_require_uppercase(value);
        self
    }

    pub fn require_non_alphanumeric(mut self, value: bool) -> Self {
        self.policy.set_require_non_alphanumeric(value);
        self
    }

    pub fn required_length(mut self, value: i32) -> Self {
        self.policy.set_required_length(value);
        self
    }

    pub fn required_unique_chars(mut self, value: i32) -> Self {
        self.policy.set_required_unique_chars(value);
        self
    }

    pub fn build(self) -> PasswordPolicy {
        self.policy
    }
}

// ============================================================================
// Lockout Policy
// ============================================================================

/// Account lockout rules.
///
/// Lockout is in force only when both the attempt threshold and the lockout
/// duration are positive; either at zero disables it. Negative inputs clamp
/// to zero rather than erroring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutPolicy {
    allowed_for_new_users: bool,
    max_failed_access_attempts: u32,
    lockout_duration: Duration,
}

impl LockoutPolicy {
    /// Create a new builder.
    pub fn builder() -> LockoutPolicyBuilder {
        LockoutPolicyBuilder::default()
    }

    /// Whether lockout applies: requires a positive attempt threshold AND a
    /// positive lockout duration.
    pub fn enabled(&self) -> bool {
        self.max_failed_access_attempts > 0 && self.lockout_duration > Duration::zero()
    }

    /// Whether accounts created from now on participate in lockout.
    pub fn allowed_for_new_users(&self) -> bool {
        self.allowed_for_new_users
    }

    pub fn max_failed_access_attempts(&self) -> u32 {
        self.max_failed_access_attempts
    }

    pub fn lockout_duration(&self) -> Duration {
        self.lockout_duration
    }

    /// The lockout duration in whole minutes, rounded up.
    ///
    /// A duration of `m` minutes plus one second reads back as `m + 1`.
    pub fn default_lockout_in_minutes(&self) -> i64 {
        let ms = self.lockout_duration.num_milliseconds();
        (ms + 59_999) / 60_000
    }

    pub fn set_allowed_for_new_users(&mut self, value: bool) {
        self.allowed_for_new_users = value;
    }

    /// Set the failed-attempt threshold; negative values clamp to zero.
    pub fn set_max_failed_access_attempts(&mut self, value: i32) {
        self.max_failed_access_attempts = if value > 0 { value as u32 } else { 0 };
    }

    /// Set the lockout duration; negative durations clamp to zero.
    pub fn set_lockout_duration(&mut self, value: Duration) {
        self.lockout_duration = if value > Duration::zero() {
            value
        } else {
            Duration::zero()
        };
    }

    /// Set the lockout duration from whole minutes; non-positive clamps to
    /// zero. Last write wins across the two duration representations.
    pub fn set_default_lockout_in_minutes(&mut self, minutes: i64) {
        self.set_lockout_duration(Duration::minutes(minutes.max(0)));
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            allowed_for_new_users: true,
            max_failed_access_attempts: 0,
            lockout_duration: Duration::zero(),
        }
    }
}

/// Builder for [`LockoutPolicy`].
#[derive(Debug, Clone, Default)]
pub struct LockoutPolicyBuilder {
    policy: LockoutPolicy,
}

impl LockoutPolicyBuilder {
    pub fn allowed_for_new_users(mut self, value: bool) -> Self {
        self.policy.set_allowed_for_new_users(value);
        self
    }

    pub fn max_failed_access_attempts(mut self, value: i32) -> Self {
        self.policy.set_max_failed_access_attempts(value);
        self
    }

    pub fn lockout_duration(mut self, value: Duration) -> Self {
        self.policy.set_lockout_duration(value);
        self
    }

    pub fn default_lockout_in_minutes(mut self, minutes: i64) -> Self {
        self.policy.set_default_lockout_in_minutes(minutes);
        self
    }

    pub fn build(self) -> LockoutPolicy {
        self.policy
    }
}

// ============================================================================
// Token Policy
// ============================================================================

/// Token issuance and validation rules.
///
/// Issuer and audience validation are derived: a claim is validated exactly
/// when the corresponding string is non-empty. The signing secret is required
/// for issuance; an empty string counts as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPolicy {
    secret: Option<String>,
    issuer: String,
    audience: String,
    expires_in_minutes: i64,
    clock_skew: Duration,
}

impl TokenPolicy {
    /// Create a new builder.
    pub fn builder() -> TokenPolicyBuilder {
        TokenPolicyBuilder::default()
    }

    /// The signing secret, if one is configured.
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// True iff an issuer is configured.
    pub fn validate_issuer(&self) -> bool {
        !self.issuer.is_empty()
    }

    /// True iff an audience is configured.
    pub fn validate_audience(&self) -> bool {
        !self.audience.is_empty()
    }

    pub fn expires_in_minutes(&self) -> i64 {
        self.expires_in_minutes
    }

    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// The clock skew in whole minutes, rounded up.
    pub fn clock_skew_in_minutes(&self) -> i64 {
        let ms = self.clock_skew.num_milliseconds();
        (ms + 59_999) / 60_000
    }

    /// Set the signing secret; an empty string clears it.
    pub fn set_secret(&mut self, secret: impl Into<String>) {
        let secret = secret.into();
        self.secret = if secret.is_empty() { None } else { Some(secret) };
    }

    pub fn set_issuer(&mut self, issuer: impl Into<String>) {
        self.issuer = issuer.into();
    }

    pub fn set_audience(&mut self, audience: impl Into<String>) {
        self.audience = audience.into();
    }

    /// Set the token lifetime in minutes; negative values clamp to zero.
    pub fn set_expires_in_minutes(&mut self, minutes: i64) {
        self.expires_in_minutes = minutes.max(0);
    }

    /// Set the validation clock skew; negative durations clamp to zero.
    pub fn set_clock_skew(&mut self, value: Duration) {
        self.clock_skew = if value > Duration::zero() {
            value
        } else {
            Duration::zero()
        };
    }

    /// Set the clock skew from whole minutes; non-positive clamps to zero.
    pub fn set_clock_skew_in_minutes(&mut self, minutes: i64) {
        self.set_clock_skew(Duration::minutes(minutes.max(0)));
    }
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            secret: None,
            issuer: String::new(),
            audience: String::new(),
            expires_in_minutes: 20,
            clock_skew: Duration::minutes(5),
        }
    }
}

/// Builder for [`TokenPolicy`].
#[derive(Debug, Clone, Default)]
pub struct TokenPolicyBuilder {
    policy: TokenPolicy,
}

impl TokenPolicyBuilder {
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.policy.set_secret(secret);
        self
    }

    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.policy.set_issuer(issuer);
        self
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.policy.set_audience(audience);
        self
    }

    pub fn expires_in_minutes(mut self, minutes: i64) -> Self {
        self.policy.set_expires_in_minutes(minutes);
        self
    }

    pub fn clock_skew(mut self, value: Duration) -> Self {
        self.policy.set_clock_skew(value);
        self
    }

    pub fn clock_skew_in_minutes(mut self, minutes: i64) -> Self {
        self.policy.set_clock_skew_in_minutes(minutes);
        self
    }

    pub fn build(self) -> TokenPolicy {
        self.policy
    }
}

// ============================================================================
// Aggregate + raw options
// ============================================================================

/// The full policy surface handed to the services at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyConfig {
    pub password: PasswordPolicy,
    pub lockout: LockoutPolicy,
    pub token: TokenPolicy,
}

impl PolicyConfig {
    /// Normalize raw options into validated policies.
    pub fn from_options(options: PolicyOptions) -> Self {
        Self {
            password: options.password.normalize(),
            lockout: options.lockout.normalize(),
            token: options.jwt.normalize(),
        }
    }
}

/// Raw `password.*` options as loaded from configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PasswordOptions {
    pub require_digit: Option<bool>,
    pub require_lowercase: Option<bool>,
    pub require_uppercase: Option<bool>,
    pub require_non_alphanumeric: Option<bool>,
    pub required_length: Option<i32>,
    pub required_unique_chars: Option<i32>,
}

impl PasswordOptions {
    fn normalize(self) -> PasswordPolicy {
        let mut policy = PasswordPolicy::default();
        if let Some(v) = self.require_digit {
            policy.set_require_digit(v);
        }
        if let Some(v) = self.require_lowercase {
            policy.set_require_lowercase(v);
        }
        if let Some(v) = self.require_uppercase {
            policy.set_require_uppercase(v);
        }
        if let Some(v) = self.require_non_alphanumeric {
            policy.set_require_non_alphanumeric(v);
        }
        if let Some(v) = self.required_length {
            policy.set_required_length(v);
        }
        if let Some(v) = self.required_unique_chars {
            policy.set_required_unique_chars(v);
        }
        policy
    }
}

/// Raw `lockout.*` options as loaded from configuration.
///
/// The time-span form is in whole seconds. When both duration
/// representations are present, the time-span form wins.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LockoutOptions {
    pub allowed_for_new_users: Option<bool>,
    pub max_failed_access_attempts: Option<i32>,
    pub default_lockout_in_minutes: Option<i64>,
    pub default_lockout_time_span: Option<i64>,
}

impl LockoutOptions {
    fn normalize(self) -> LockoutPolicy {
        let mut policy = LockoutPolicy::default();
        if let Some(v) = self.allowed_for_new_users {
            policy.set_allowed_for_new_users(v);
        }
        if let Some(v) = self.max_failed_access_attempts {
            policy.set_max_failed_access_attempts(v);
        }
        if let Some(v) = self.default_lockout_in_minutes {
            policy.set_default_lockout_in_minutes(v);
        }
        // Applied after the minutes form so it overwrites on conflict.
        if let Some(v) = self.default_lockout_time_span {
            policy.set_lockout_duration(Duration::seconds(v));
        }
        policy
    }
}

/// Raw `jwt.*` options as loaded from configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JwtOptions {
    pub secret: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub expires_in_minutes: Option<i64>,
    pub clock_skew_in_minutes: Option<i64>,
}

impl JwtOptions {
    fn normalize(self) -> TokenPolicy {
        let mut policy = TokenPolicy::default();
        if let Some(v) = self.secret {
            policy.set_secret(v);
        }
        if let Some(v) = self.issuer {
            policy.set_issuer(v);
        }
        if let Some(v) = self.audience {
            policy.set_audience(v);
        }
        if let Some(v) = self.expires_in_minutes {
            policy.set_expires_in_minutes(v);
        }
        if let Some(v) = self.clock_skew_in_minutes {
            policy.set_clock_skew_in_minutes(v);
        }
        policy
    }
}

/// Raw options for the whole policy surface.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyOptions {
    pub password: PasswordOptions,
    pub lockout: LockoutOptions,
    pub jwt: JwtOptions,
}

// ============================================================================
// Tests
// ============================================================================

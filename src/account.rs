//! Account Service
//!
//! Orchestrates registration and login against a [`UserStore`], enforcing
//! the account-lockout state machine and minting tokens on successful
//! authentication.
//!
//! Ordering is load-bearing in the login path: the lockout check runs
//! strictly before the password check, so a locked-out caller never learns
//! whether their credentials were right. Failed-attempt counting is
//! per-account and lockout expiry is evaluated lazily on the next attempt —
//! there is no sweeper and no manual unlock. The failure counter resets only
//! on a successful login, never when the window lapses.
//!
//! Every store and token interaction is individually wrapped: an
//! infrastructure fault is logged with detail and surfaced to the caller as
//! a generic failure message. Faults during the lockout check or the
//! password check fail closed — a broken store must never let a caller in.

use std::fmt;

use crate::observability::SecurityEvent;
use crate::policy::LockoutPolicy;
use crate::request::{LoginRequest, LoginResponse, RegisterResponse, RegistrationRequest};
use crate::security_event;
use crate::store::{NewUser, UserRecord, UserStore};
use crate::token::{Claim, TokenService};
use crate::validation::Validate;

/// Shown when the store faults during registration.
const REGISTRATION_FAULT: &str =
    "An error occurred while creating your account. Please try again later.";
/// Shown when the store or token service faults during login.
const LOGIN_FAULT: &str = "Something went wrong while signing in. Please try again later.";

/// Failure outcome of an account operation: an ordered list of user-facing
/// messages. Infrastructure detail never appears here — it goes to the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountError {
    messages: Vec<String>,
}

impl AccountError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }

    pub fn from_messages(messages: Vec<String>) -> Self {
        debug_assert!(!messages.is_empty(), "failure without messages");
        Self { messages }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Whether any message contains the given fragment (case-insensitive).
    pub fn mentions(&self, fragment: &str) -> bool {
        let fragment = fragment.to_lowercase();
        self.messages
            .iter()
            .any(|m| m.to_lowercase().contains(&fragment))
    }
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages.join(", "))
    }
}

impl std::error::Error for AccountError {}

/// Uniform outcome type for account operations.
pub type AccountResult<T> = Result<T, AccountError>;

/// Registration and login orchestration over a pluggable [`UserStore`].
pub struct AccountService<S> {
    store: S,
    lockout: LockoutPolicy,
    tokens: TokenService,
}

impl<S: UserStore> AccountService<S> {
    pub fn new(store: S, lockout: LockoutPolicy, tokens: TokenService) -> Self {
        Self {
            store,
            lockout,
            tokens,
        }
    }

    fn lockout_enabled(&self) -> bool {
        self.lockout.enabled()
    }

    /// Register a new account.
    ///
    /// Structural defects are aggregated (one message per violated rule);
    /// password-policy and duplicate-identity checks are the store's and
    /// surface the store's message for the first failing check.
    pub async fn register_user(&self, request: &RegistrationRequest) -> AccountResult<RegisterResponse> {
        if let Err(violations) = request.validate() {
            tracing::warn!(
                email = %request.email,
                violation_count = violations.len(),
                "Registration request failed validation"
            );
            return Err(AccountError::from_messages(
                violations.into_iter().map(|v| v.message).collect(),
            ));
        }

        let username = request
            .username
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| request.email.clone());
        let candidate = NewUser {
            email: request.email.clone(),
            username,
        };

        match self.store.create(&candidate, &request.password).await {
            Ok(outcome) if outcome.succeeded => {
                security_event!(
                    SecurityEvent::UserRegistered,
                    email = %candidate.email,
                    username = %candidate.username,
                    "New user registered"
                );
                Ok(RegisterResponse {
                    email: candidate.email,
                })
            }
            Ok(outcome) => {
                tracing::warn!(
                    email = %candidate.email,
                    errors = ?outcome.errors,
                    "Failed to create user"
                );
                Err(AccountError::from_messages(outcome.errors))
            }
            Err(e) => {
                tracing::error!(
                    email = %candidate.email,
                    error = %e,
                    "Store fault while creating user"
                );
                Err(AccountError::new(REGISTRATION_FAULT))
            }
        }
    }

    /// Authenticate a user and mint a token.
    pub async fn login_user(&self, request: &LoginRequest) -> AccountResult<LoginResponse> {
        let user = self.find_user(request).await?;

        if self.lockout_enabled() && self.is_locked_out(&user).await? {
            security_event!(
                SecurityEvent::AuthenticationFailure,
                user_id = %user.id,
                reason = "locked_out",
                "Login attempt while locked out"
            );
            return Err(AccountError::new(
                "Your account is temporarily locked out due to multiple failed login attempts. Please try again later.",
            ));
        }

        if !self.check_password(&user, &request.password).await? {
            self.record_failed_attempt(&user).await;
            security_event!(
                SecurityEvent::AuthenticationFailure,
                user_id = %user.id,
                reason = "invalid_password",
                "Incorrect password provided"
            );
            return Err(AccountError::new("Invalid password."));
        }

        self.clear_failed_attempts(&user).await;

        let claims = [Claim::subject(user.id.to_string())];
        let token = match self.tokens.generate_token(&claims) {
            Ok(token) => token,
            Err(e) => {
                security_event!(
                    SecurityEvent::TokenRejected,
                    user_id = %user.id,
                    kind = %e.kind,
                    "Token issuance failed after successful authentication"
                );
                return Err(AccountError::new(LOGIN_FAULT));
            }
        };

        security_event!(
            SecurityEvent::AuthenticationSuccess,
            user_id = %user.id,
            "User authenticated"
        );
        security_event!(
            SecurityEvent::TokenIssued,
            user_id = %user.id,
            "Token issued"
        );

        Ok(LoginResponse {
            token,
            expires_in_secs: self.tokens.policy().expires_in_minutes().max(0) as u64 * 60,
        })
    }

    // ------------------------------------------------------------------
    // Wrapped store interactions. Each converts backend faults into a
    // user-facing generic failure and logs the detail.
    // ------------------------------------------------------------------

    async fn find_user(&self, request: &LoginRequest) -> AccountResult<UserRecord> {
        if let Some(email) = request.email.as_deref().filter(|e| !e.trim().is_empty()) {
            return self.find_by_email(email).await;
        }
        if let Some(username) = request.username.as_deref().filter(|u| !u.trim().is_empty()) {
            return self.find_by_username(username).await;
        }

        tracing::warn!("Login request carried neither email nor username");
        Err(AccountError::new("Provide a valid email or username."))
    }

    async fn find_by_email(&self, email: &str) -> AccountResult<UserRecord> {
        match self.store.find_by_email(email).await {
            Ok(Some(user)) => {
                tracing::info!(email = %email, "User found by email");
                Ok(user)
            }
            Ok(None) => {
                tracing::warn!(email = %email, "No user found by email");
                Err(AccountError::new(format!(
                    "Could not find user with email '{}'.",
                    email
                )))
            }
            Err(e) => {
                tracing::error!(email = %email, error = %e, "Store fault during email lookup");
                Err(AccountError::new(LOGIN_FAULT))
            }
        }
    }

    async fn find_by_username(&self, username: &str) -> AccountResult<UserRecord> {
        match self.store.find_by_username(username).await {
            Ok(Some(user)) => {
                tracing::info!(username = %username, "User found by username");
                Ok(user)
            }
            Ok(None) => {
                tracing::warn!(username = %username, "No user found by username");
                Err(AccountError::new(format!(
                    "Could not find user with username '{}'.",
                    username
                )))
            }
            Err(e) => {
                tracing::error!(username = %username, error = %e, "Store fault during username lookup");
                Err(AccountError::new(LOGIN_FAULT))
            }
        }
    }

    /// Fail closed: a fault while checking lockout state is a failed login,
    /// never a pass-through.
    async fn is_locked_out(&self, user: &UserRecord) -> AccountResult<bool> {
        match self.store.is_locked_out(user).await {
            Ok(locked) => Ok(locked),
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "Store fault during lockout check");
                Err(AccountError::new(LOGIN_FAULT))
            }
        }
    }

    /// Fail closed: a fault during password verification rejects the login.
    async fn check_password(&self, user: &UserRecord, password: &str) -> AccountResult<bool> {
        match self.store.check_password(user, password).await {
            Ok(matched) => Ok(matched),
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "Store fault during password check");
                Err(AccountError::new(LOGIN_FAULT))
            }
        }
    }

    /// Best-effort: the login already fails with "invalid password"; a fault
    /// here only costs the increment.
    async fn record_failed_attempt(&self, user: &UserRecord) {
        match self.store.access_failed(user).await {
            Ok(outcome) if outcome.succeeded => {
                tracing::info!(user_id = %user.id, "Recorded failed access attempt");
            }
            Ok(outcome) => {
                tracing::warn!(user_id = %user.id, errors = ?outcome.errors, "Could not record failed access attempt");
            }
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "Store fault while recording failed attempt");
            }
        }
    }

    /// Best-effort: nothing is let in that should be kept out if the reset
    /// fails, so the login proceeds.
    async fn clear_failed_attempts(&self, user: &UserRecord) {
        match self.store.reset_access_failed(user).await {
            Ok(outcome) if outcome.succeeded => {}
            Ok(outcome) => {
                tracing::warn!(user_id = %user.id, errors = ?outcome.errors, "Could not reset failed access count");
            }
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "Store fault while resetting failed access count");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

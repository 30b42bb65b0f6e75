//! User Store
//!
//! The narrow capability interface the account service consumes for
//! credential persistence and lockout counters, plus an in-memory reference
//! implementation suitable for tests and single-instance deployments.
//!
//! The core assumes nothing about the backend beyond "unique by normalized
//! email" and "unique by normalized username" — SQL, document stores, and
//! caches can all sit behind [`UserStore`]. Implementations own password
//! hashing and verification; the service never sees a hash. Under concurrent
//! failed attempts on one account, implementations are expected to update
//! the failure counter atomically (the in-memory store holds a write lock
//! across its read-modify-write; a SQL store would use an atomic increment
//! or row lock).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

use crate::crypto::constant_time_str_eq;
use crate::observability::SecurityEvent;
use crate::policy::{LockoutPolicy, PasswordPolicy};
use crate::security_event;

/// Longest accepted email, username, and password.
const FIELD_CAP: usize = 255;

/// A stored credential record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    /// Consecutive failed password checks since the last successful login.
    pub access_failed_count: u32,
    /// Instant the current lockout window ends, if one was armed.
    pub lockout_end: Option<DateTime<Utc>>,
    /// Whether this account participates in lockout at all.
    pub lockout_enabled: bool,
}

/// Candidate credential for registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
}

/// Identity-result shape returned by mutating store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOutcome {
    pub succeeded: bool,
    pub errors: Vec<String>,
}

impl StoreOutcome {
    pub fn success() -> Self {
        Self {
            succeeded: true,
            errors: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            errors: vec![message.into()],
        }
    }
}

/// Infrastructure fault inside a store backend. Never shown to end users;
/// the account service logs it and degrades to a generic failure.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("user store backend failure: {0}")]
    Backend(String),
}

/// Credential persistence and lockout counters.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new credential record, applying password-policy and
    /// duplicate-identity checks. A policy rejection is a failed
    /// [`StoreOutcome`]; `Err` is reserved for backend faults.
    async fn create(&self, user: &NewUser, password: &str) -> Result<StoreOutcome, StoreError>;

    /// Compare a candidate password against the stored credential.
    async fn check_password(&self, user: &UserRecord, password: &str) -> Result<bool, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError>;

    /// Case-insensitive lookup by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Case-insensitive lookup by username.
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Whether the account is inside an active lockout window right now.
    async fn is_locked_out(&self, user: &UserRecord) -> Result<bool, StoreError>;

    /// Record a failed password check: increments the counter and arms the
    /// lockout window once the policy threshold is reached.
    async fn access_failed(&self, user: &UserRecord) -> Result<StoreOutcome, StoreError>;

    /// Return the failure counter to zero and clear any lockout.
    async fn reset_access_failed(&self, user: &UserRecord) -> Result<StoreOutcome, StoreError>;
}

// ============================================================================
// In-memory implementation
// ============================================================================

/// In-memory [`UserStore`] for tests and single-instance deployments.
///
/// Stores the password verbatim as the "hash" — hashing is the concern of a
/// production backend, and the store contract only requires the comparison
/// to be constant-time, which this keeps.
#[derive(Debug)]
pub struct InMemoryUserStore {
    password_policy: PasswordPolicy,
    lockout_policy: LockoutPolicy,
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new(password_policy: PasswordPolicy, lockout_policy: LockoutPolicy) -> Self {
        Self {
            password_policy,
            lockout_policy,
            users: RwLock::new(HashMap::new()),
        }
    }

    /// First policy violation for a candidate password, if any.
    ///
    /// Check order: length minimum, lowercase, uppercase, digit,
    /// non-alphanumeric, unique-character count.
    fn password_violation(&self, password: &str) -> Option<String> {
        let policy = &self.password_policy;

        if password.chars().count() < policy.required_length() {
            return Some(format!(
                "Password must be at least {} characters long.",
                policy.required_length()
            ));
        }
        if policy.require_lowercase() && !password.chars().any(|c| c.is_ascii_lowercase()) {
            return Some("Password requires a lowercase character.".into());
        }
        if policy.require_uppercase() && !password.chars().any(|c| c.is_ascii_uppercase()) {
            return Some("Password requires an uppercase character.".into());
        }
        if policy.require_digit() && !password.chars().any(|c| c.is_ascii_digit()) {
            return Some("Password requires a digit.".into());
        }
        if policy.require_non_alphanumeric()
            && !password.chars().any(|c| !c.is_ascii_alphanumeric())
        {
            return Some("Password requires a non-alphanumeric character.".into());
        }

        let unique: std::collections::HashSet<char> = password.chars().collect();
        if unique.len() < policy.required_unique_chars() {
            return Some(format!(
                "Password requires at least {} unique characters.",
                policy.required_unique_chars()
            ));
        }

        None
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: &NewUser, password: &str) -> Result<StoreOutcome, StoreError> {
        let mut users = self.users.write();

        // Duplicate identity first; a taken email/username short-circuits
        // every password check.
        let duplicate = users.values().any(|existing| {
            existing.email.eq_ignore_ascii_case(&user.email)
                || existing.username.eq_ignore_ascii_case(&user.username)
        });
        if duplicate {
            return Ok(StoreOutcome::failure("User already exists!"));
        }

        if let Some(violation) = self.password_violation(password) {
            return Ok(StoreOutcome::failure(violation));
        }
        if user.email.len() > FIELD_CAP {
            return Ok(StoreOutcome::failure(format!(
                "Email must be at most {} characters.",
                FIELD_CAP
            )));
        }
        if user.username.len() > FIELD_CAP {
            return Ok(StoreOutcome::failure(format!(
                "Username must be at most {} characters.",
                FIELD_CAP
            )));
        }
        if password.len() > FIELD_CAP {
            return Ok(StoreOutcome::failure(format!(
                "Password must be at most {} characters.",
                FIELD_CAP
            )));
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            email: user.email.clone(),
            username: user.username.clone(),
            password_hash: password.to_string(),
            access_failed_count: 0,
            lockout_end: None,
            lockout_enabled: self.lockout_policy.allowed_for_new_users(),
        };
        users.insert(record.id, record);

        Ok(StoreOutcome::success())
    }

    async fn check_password(&self, user: &UserRecord, password: &str) -> Result<bool, StoreError> {
        let users = self.users.read();
        Ok(users
            .get(&user.id)
            .is_some_and(|record| constant_time_str_eq(&record.password_hash, password)))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .read()
            .values()
            .find(|record| record.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .read()
            .values()
            .find(|record| record.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn is_locked_out(&self, user: &UserRecord) -> Result<bool, StoreError> {
        let users = self.users.read();
        let locked = users.get(&user.id).is_some_and(|record| {
            record.lockout_enabled
                && record
                    .lockout_end
                    .is_some_and(|end| Utc::now() < end)
        });
        Ok(locked)
    }

    async fn access_failed(&self, user: &UserRecord) -> Result<StoreOutcome, StoreError> {
        let mut users = self.users.write();
        let Some(record) = users.get_mut(&user.id) else {
            return Ok(StoreOutcome::failure("User not found."));
        };

        record.access_failed_count += 1;

        if self.lockout_policy.enabled()
            && record.lockout_enabled
            && record.access_failed_count >= self.lockout_policy.max_failed_access_attempts()
        {
            record.lockout_end = Some(Utc::now() + self.lockout_policy.lockout_duration());
            security_event!(
                SecurityEvent::AccountLocked,
                user_id = %record.id,
                failed_count = record.access_failed_count,
                lockout_minutes = self.lockout_policy.default_lockout_in_minutes(),
                "Account locked after failed login attempts"
            );
        }

        Ok(StoreOutcome::success())
    }

    async fn reset_access_failed(&self, user: &UserRecord) -> Result<StoreOutcome, StoreError> {
        let mut users = self.users.write();
        let Some(record) = users.get_mut(&user.id) else {
            return Ok(StoreOutcome::failure("User not found."));
        };

        record.access_failed_count = 0;
        if record.lockout_end.take().is_some() {
            security_event!(
                SecurityEvent::AccountUnlocked,
                user_id = %record.id,
                "Account lockout cleared"
            );
        }

        Ok(StoreOutcome::success())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn relaxed_password_policy() -> PasswordPolicy {
        PasswordPolicy::builder()
            .require_uppercase(false)
            .require_non_alphanumeric(false)
            .build()
    }

    fn lockout(attempts: i32, duration: Duration) -> LockoutPolicy {
        LockoutPolicy::builder()
            .max_failed_access_attempts(attempts)
            .lockout_duration(duration)
            .build()
    }

    fn store() -> InMemoryUserStore {
        InMemoryUserStore::new(relaxed_password_policy(), lockout(2, Duration::minutes(5)))
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            username: email.into(),
        }
    }

    async fn must_create(store: &InMemoryUserStore, email: &str, password: &str) -> UserRecord {
        let outcome = store.create(&new_user(email), password).await.unwrap();
        assert!(outcome.succeeded, "create failed: {:?}", outcome.errors);
        store.find_by_email(email).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = store();
        let user = must_create(&store, "test@gmail.com", "test123").await;
        assert_eq!(user.access_failed_count, 0);
        assert!(user.lockout_end.is_none());
        assert!(user.lockout_enabled);

        let by_name = store.find_by_username("test@gmail.com").await.unwrap();
        assert_eq!(by_name.unwrap().id, user.id);
        let by_id = store.find_by_id(user.id).await.unwrap();
        assert!(by_id.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_case_insensitively() {
        let store = store();
        must_create(&store, "test@gmail.com", "test123").await;

        let outcome = store
            .create(&new_user("TEST@GMAIL.COM"), "test123")
            .await
            .unwrap();
        assert!(!outcome.succeeded);
        assert!(outcome.errors[0].contains("already exists"));
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let store = store();
        must_create(&store, "test@gmail.com", "test123").await;

        let candidate = NewUser {
            email: "other@gmail.com".into(),
            username: "Test@Gmail.Com".into(),
        };
        let outcome = store.create(&candidate, "test123").await.unwrap();
        assert!(!outcome.succeeded);
        assert!(outcome.errors[0].contains("already exists"));
    }

    #[tokio::test]
    async fn test_password_length_boundary() {
        let store = store();

        // Exactly at the required length (6 with the relaxed policy).
        let outcome = store.create(&new_user("a@example.com"), "abc123").await.unwrap();
        assert!(outcome.succeeded);

        // One character short.
        let outcome = store.create(&new_user("b@example.com"), "abc12").await.unwrap();
        assert!(!outcome.succeeded);
        assert_eq!(
            outcome.errors[0],
            "Password must be at least 6 characters long."
        );
    }

    #[tokio::test]
    async fn test_password_character_class_checks() {
        let policy = PasswordPolicy::builder()
            .required_length(6)
            .require_non_alphanumeric(true)
            .build();
        let store = InMemoryUserStore::new(policy, LockoutPolicy::default());

        let cases = [
            ("ABC123", "lowercase"),
            ("abc123", "uppercase"),
            ("abcDEF", "digit"),
            ("abcDE9", "non-alphanumeric"),
        ];
        for (password, expected) in cases {
            let outcome = store.create(&new_user("x@example.com"), password).await.unwrap();
            assert!(!outcome.succeeded, "{password} should be rejected");
            assert!(
                outcome.errors[0].contains(expected),
                "{password}: {:?}",
                outcome.errors
            );
        }

        let outcome = store.create(&new_user("x@example.com"), "abcDE9!").await.unwrap();
        assert!(outcome.succeeded);
    }

    #[tokio::test]
    async fn test_unique_character_requirement() {
        let policy = PasswordPolicy::builder()
            .require_digit(false)
            .require_uppercase(false)
            .required_length(6)
            .required_unique_chars(4)
            .build();
        let store = InMemoryUserStore::new(policy, LockoutPolicy::default());

        let outcome = store.create(&new_user("x@example.com"), "aabbab").await.unwrap();
        assert!(!outcome.succeeded);
        assert_eq!(
            outcome.errors[0],
            "Password requires at least 4 unique characters."
        );
    }

    #[tokio::test]
    async fn test_field_length_caps() {
        let store = store();

        let long_email = format!("{}@example.com", "a".repeat(250));
        let outcome = store
            .create(
                &NewUser {
                    email: long_email.clone(),
                    username: "capped".into(),
                },
                "test123",
            )
            .await
            .unwrap();
        assert!(!outcome.succeeded);
        assert!(outcome.errors[0].starts_with("Email"));

        let outcome = store
            .create(&new_user("c@example.com"), &format!("aB1{}", "x".repeat(260)))
            .await
            .unwrap();
        assert!(!outcome.succeeded);
        assert!(outcome.errors[0].starts_with("Password must be at most"));
    }

    #[tokio::test]
    async fn test_check_password() {
        let store = store();
        let user = must_create(&store, "test@gmail.com", "test123").await;

        assert!(store.check_password(&user, "test123").await.unwrap());
        assert!(!store.check_password(&user, "test321").await.unwrap());
    }

    #[tokio::test]
    async fn test_access_failed_arms_lockout_at_threshold() {
        let store = store();
        let user = must_create(&store, "test@gmail.com", "test123").await;

        store.access_failed(&user).await.unwrap();
        assert!(!store.is_locked_out(&user).await.unwrap());

        store.access_failed(&user).await.unwrap();
        assert!(store.is_locked_out(&user).await.unwrap());

        let record = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(record.access_failed_count, 2);
        assert!(record.lockout_end.is_some());
    }

    #[tokio::test]
    async fn test_lockout_expires_lazily() {
        let store = InMemoryUserStore::new(
            relaxed_password_policy(),
            lockout(1, Duration::milliseconds(50)),
        );
        let user = must_create(&store, "test@gmail.com", "test123").await;

        store.access_failed(&user).await.unwrap();
        assert!(store.is_locked_out(&user).await.unwrap());

        tokio::time::sleep(std::time::Duration::from_millis(80)).await;

        // No unlock call: the window elapsing is enough.
        assert!(!store.is_locked_out(&user).await.unwrap());
        // But the counter is untouched until a successful login resets it.
        let record = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(record.access_failed_count, 1);
    }

    #[tokio::test]
    async fn test_reset_clears_counter_and_lockout() {
        let store = store();
        let user = must_create(&store, "test@gmail.com", "test123").await;

        store.access_failed(&user).await.unwrap();
        store.access_failed(&user).await.unwrap();
        assert!(store.is_locked_out(&user).await.unwrap());

        let outcome = store.reset_access_failed(&user).await.unwrap();
        assert!(outcome.succeeded);
        assert!(!store.is_locked_out(&user).await.unwrap());

        let record = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(record.access_failed_count, 0);
        assert!(record.lockout_end.is_none());
    }

    #[tokio::test]
    async fn test_lockout_not_armed_when_disabled() {
        let store = InMemoryUserStore::new(relaxed_password_policy(), LockoutPolicy::default());
        let user = must_create(&store, "test@gmail.com", "test123").await;

        for _ in 0..5 {
            store.access_failed(&user).await.unwrap();
        }
        assert!(!store.is_locked_out(&user).await.unwrap());
    }

    #[tokio::test]
    async fn test_lockout_skipped_for_exempt_accounts() {
        let policy = LockoutPolicy::builder()
            .allowed_for_new_users(false)
            .max_failed_access_attempts(2)
            .lockout_duration(Duration::minutes(5))
            .build();
        let store = InMemoryUserStore::new(relaxed_password_policy(), policy);
        let user = must_create(&store, "test@gmail.com", "test123").await;
        assert!(!user.lockout_enabled);

        for _ in 0..5 {
            store.access_failed(&user).await.unwrap();
        }
        assert!(!store.is_locked_out(&user).await.unwrap());
    }
}

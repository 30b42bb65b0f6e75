//! # Portcullis
//!
//! Account authentication core: registration, login, password policy
//! enforcement, account lockout, and JWT issuance/validation.
//!
//! This crate is intentionally decoupled from HTTP and storage. Persistence
//! sits behind the narrow [`store::UserStore`] trait (an in-memory reference
//! implementation ships for tests and single-instance use), and all
//! transport concerns belong to the embedding application.
//!
//! ## Features
//!
//! - **Validated policies**: password, lockout, and token policies that are
//!   impossible to observe in an invalid state
//! - **Lockout state machine**: per-account failure counting with lazily
//!   evaluated lockout expiry, checked strictly before the password
//! - **Token service**: stateless HS256 JWT issuance and validation with
//!   machine-readable error kinds
//! - **Security events**: structured audit logging over `tracing`
//! - **Fail-closed boundaries**: store faults degrade to generic failures,
//!   never to a successful login
//!
//! ## Quick Start
//!
//! ```ignore
//! use portcullis::prelude::*;
//!
//! let policy = PolicyConfig::default();
//! let store = InMemoryUserStore::new(policy.password.clone(), policy.lockout.clone());
//! let tokens = TokenService::new(policy.token.clone());
//! let accounts = AccountService::new(store, policy.lockout.clone(), tokens);
//!
//! let response = accounts
//!     .login_user(&LoginRequest {
//!         email: Some("user@example.com".into()),
//!         username: None,
//!         password: "hunter2!".into(),
//!     })
//!     .await?;
//! println!("token: {}", response.token);
//! ```

pub mod account;
pub mod crypto;
pub mod observability;
pub mod policy;
pub mod prelude;
pub mod request;
pub mod store;
pub mod token;
pub mod validation;

// Re-exports
pub use account::{AccountError, AccountResult, AccountService};
pub use crypto::{constant_time_eq, constant_time_str_eq};
pub use observability::{init_tracing, SecurityEvent, Severity};
pub use policy::{LockoutPolicy, PasswordPolicy, PolicyConfig, PolicyOptions, TokenPolicy};
pub use request::{LoginRequest, LoginResponse, RegisterResponse, RegistrationRequest};
pub use store::{InMemoryUserStore, NewUser, StoreError, StoreOutcome, UserRecord, UserStore};
pub use token::{Claim, SecurityError, TokenError, TokenService};
pub use validation::{Validate, ValidationError};

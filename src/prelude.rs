//! Convenience re-exports for embedding applications.
//!
//! ```ignore
//! use portcullis::prelude::*;
//! ```

pub use crate::account::{AccountError, AccountResult, AccountService};
pub use crate::policy::{
    LockoutPolicy, PasswordPolicy, PolicyConfig, PolicyOptions, TokenPolicy,
};
pub use crate::request::{LoginRequest, LoginResponse, RegisterResponse, RegistrationRequest};
pub use crate::store::{InMemoryUserStore, NewUser, StoreOutcome, UserRecord, UserStore};
pub use crate::token::{Claim, SecurityError, TokenError, TokenService};
pub use crate::validation::{Validate, ValidationError};

//! Security Event Logging
//!
//! Structured logging for security-relevant authentication events. The
//! service and store code emit events through [`security_event!`]; the
//! embedding application decides where the `tracing` output goes.
//!
//! # Usage
//!
//! ```ignore
//! use portcullis::observability::SecurityEvent;
//! use portcullis::security_event;
//!
//! security_event!(
//!     SecurityEvent::AuthenticationFailure,
//!     user_id = %user.id,
//!     reason = "invalid_password",
//!     "Authentication failed"
//! );
//! ```

use std::fmt;

use tracing_subscriber::{fmt as sub_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Security event categories for audit logging.
///
/// Every variant is emitted somewhere in this crate; application-specific
/// events belong in the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    /// Successful user authentication
    AuthenticationSuccess,
    /// Failed authentication attempt (wrong password, unknown user, locked out)
    AuthenticationFailure,
    /// New user registered
    UserRegistered,
    /// Account locked after too many failed attempts
    AccountLocked,
    /// Account lockout cleared
    AccountUnlocked,
    /// Token issued to an authenticated user
    TokenIssued,
    /// Token issuance or validation rejected
    TokenRejected,
}

impl SecurityEvent {
    /// Event category for filtering/grouping.
    pub fn category(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess | Self::AuthenticationFailure => "authentication",
            Self::UserRegistered => "user_management",
            Self::AccountLocked | Self::AccountUnlocked => "security",
            Self::TokenIssued | Self::TokenRejected => "token",
        }
    }

    /// Severity used to pick the `tracing` level.
    pub fn severity(&self) -> Severity {
        match self {
            Self::AuthenticationFailure | Self::AccountLocked | Self::TokenRejected => {
                Severity::High
            }
            Self::AuthenticationSuccess | Self::UserRegistered | Self::AccountUnlocked => {
                Severity::Medium
            }
            Self::TokenIssued => Severity::Low,
        }
    }

    /// Stable event name for log queries.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess => "authentication_success",
            Self::AuthenticationFailure => "authentication_failure",
            Self::UserRegistered => "user_registered",
            Self::AccountLocked => "account_locked",
            Self::AccountUnlocked => "account_unlocked",
            Self::TokenIssued => "token_issued",
            Self::TokenRejected => "token_rejected",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Event severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Routine operations
    Low,
    /// Important state changes
    Medium,
    /// Security-relevant failures
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Log a security event with structured fields.
///
/// Automatically attaches `security_event`, `category`, and `severity`
/// fields and routes to the `tracing` level matching the event severity.
#[macro_export]
macro_rules! security_event {
    ($event:expr, $($field:tt)*) => {{
        let event = $event;
        let category = event.category();
        let event_name = event.name();

        match event.severity() {
            $crate::observability::Severity::High => {
                ::tracing::warn!(
                    security_event = event_name,
                    category = category,
                    severity = "high",
                    $($field)*
                );
            }
            $crate::observability::Severity::Medium => {
                ::tracing::info!(
                    security_event = event_name,
                    category = category,
                    severity = "medium",
                    $($field)*
                );
            }
            $crate::observability::Severity::Low => {
                ::tracing::debug!(
                    security_event = event_name,
                    category = category,
                    severity = "low",
                    $($field)*
                );
            }
        }
    }};
}

/// Observability bootstrap error.
#[derive(Debug, Clone)]
pub enum ObservabilityError {
    /// The log filter could not be parsed
    Config(String),
    /// A global subscriber is already installed
    Init(String),
}

impl fmt::Display for ObservabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "invalid log filter: {}", msg),
            Self::Init(msg) => write!(f, "failed to init tracing: {}", msg),
        }
    }
}

impl std::error::Error for ObservabilityError {}

/// Initialize a compact stdout `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Intended for the
/// embedding application's startup path; calling it twice returns an error
/// from the second call.
pub fn init_tracing(default_filter: &str) -> Result<(), ObservabilityError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| ObservabilityError::Config(e.to_string()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(sub_fmt::layer().compact().with_target(true))
        .try_init()
        .map_err(|e| ObservabilityError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_categories() {
        assert_eq!(SecurityEvent::AuthenticationFailure.category(), "authentication");
        assert_eq!(SecurityEvent::UserRegistered.category(), "user_management");
        assert_eq!(SecurityEvent::AccountLocked.category(), "security");
        assert_eq!(SecurityEvent::TokenIssued.category(), "token");
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(SecurityEvent::AccountLocked.severity(), Severity::High);
        assert_eq!(SecurityEvent::AuthenticationSuccess.severity(), Severity::Medium);
        assert_eq!(SecurityEvent::TokenIssued.severity(), Severity::Low);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn test_event_names_are_stable() {
        assert_eq!(SecurityEvent::AccountUnlocked.to_string(), "account_unlocked");
        assert_eq!(SecurityEvent::TokenRejected.name(), "token_rejected");
    }
}

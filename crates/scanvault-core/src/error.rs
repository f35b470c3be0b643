//! # Error Types
//!
//! Error taxonomy shared by every ScanVault crate.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  scanvault-core errors (this file)                                     │
//! │  ├── AuthError         - Sign-in / sign-up / sign-out failures         │
//! │  ├── PersistenceError  - Record store read/write failures              │
//! │  ├── PermissionError   - Camera access denied                          │
//! │  ├── ValidationError   - Form input rejected before any network call   │
//! │  └── CoreError         - State machine misuse                          │
//! │                                                                         │
//! │  scanvault-db errors        └── DbError    (sqlx)                      │
//! │  scanvault-cloud errors     └── CloudError (HTTP, config)              │
//! │  app errors                 └── ApiError   (what front-ends see)       │
//! │                                                                         │
//! │  Flow: DbError/CloudError → Auth/PersistenceError → ApiError → Alert   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Policy
//! - Auth errors are returned as values to the initiating screen.
//! - Persistence errors are shown as alerts; nothing is rolled back.
//! - Sign-out errors are logged and swallowed by the session store.

use thiserror::Error;

// =============================================================================
// Auth Error
// =============================================================================

/// Failures surfaced by the identity gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Unknown account, wrong password, or disabled account.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Sign-up with an email that already has an account.
    #[error("Email is already in use")]
    EmailAlreadyInUse,

    /// The provider rejected the password as too weak.
    #[error("Password is too weak")]
    WeakPassword,

    /// The provider rejected the email format.
    #[error("Email address is malformed")]
    InvalidEmail,

    /// The provider is throttling this client.
    #[error("Too many attempts, try again later")]
    TooManyAttempts,

    /// The request never reached the provider or the response was lost.
    #[error("Network failure: {0}")]
    Network(String),

    /// An operation required a signed-in user.
    #[error("Not signed in")]
    NotSignedIn,

    /// Any other provider-reported failure.
    #[error("Identity provider error: {0}")]
    Provider(String),
}

// =============================================================================
// Persistence Error
// =============================================================================

/// Failures surfaced by a record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// Writing a record failed.
    #[error("Failed to save record: {0}")]
    WriteFailed(String),

    /// Reading records failed.
    #[error("Failed to load records: {0}")]
    ReadFailed(String),

    /// The store refused the caller's credentials.
    #[error("Record store rejected credentials: {0}")]
    Unauthorized(String),

    /// The store could not be reached.
    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// Permission Error
// =============================================================================

/// Device permission failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// The user (or OS policy) denied camera access.
    #[error("No access to camera")]
    CameraDenied,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Each variant carries the field it belongs to so forms can render the
/// message next to the offending input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is empty.
    #[error("{message}")]
    Required { field: String, message: String },

    /// Field value is too short.
    #[error("{message}")]
    TooShort {
        field: String,
        min: usize,
        message: String,
    },

    /// Invalid format (e.g. malformed email).
    #[error("{message}")]
    InvalidFormat { field: String, message: String },

    /// Two fields that must match do not.
    #[error("{message}")]
    Mismatch { field: String, message: String },
}

impl ValidationError {
    /// Name of the form field this error belongs to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field, .. }
            | ValidationError::TooShort { field, .. }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::Mismatch { field, .. } => field,
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Misuse of a core state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An event arrived in a state that does not accept it.
    ///
    /// ## When This Occurs
    /// - A second `restore` after the session left `Loading`
    /// - A scan action chosen while nothing is decoded
    #[error("Cannot apply {event} while {state}")]
    InvalidTransition { state: String, event: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub(crate) fn invalid_transition(state: impl Into<String>, event: impl Into<String>) -> Self {
        CoreError::InvalidTransition {
            state: state.into(),
            event: event.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result of an identity operation.
pub type AuthResult<T> = Result<T, AuthError>;

/// Result of a record store operation.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

// =============================================================================
// Unit Tests
// =============================================================================

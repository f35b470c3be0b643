//! # API Error Type
//!
//! Unified error type for application commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in ScanVault                              │
//! │                                                                         │
//! │  Screen action                 Command                                  │
//! │  ─────────────                 ───────                                  │
//! │                                                                         │
//! │  "Save"                                                                 │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │                                                                  │  │
//! │  │  AuthError ─────────── AUTH_FAILED / NOT_SIGNED_IN ────┐        │  │
//! │  │  PersistenceError ──── STORAGE_ERROR ──────────────────┤        │  │
//! │  │  PermissionError ───── PERMISSION_DENIED ──────────────┼──► UI  │  │
//! │  │  FormErrors ────────── VALIDATION_ERROR ───────────────┤        │  │
//! │  │  DbError / CloudError ─ DATABASE_ERROR / NETWORK_ERROR ┘        │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  The shell shows `message` in an alert; a web or mobile front-end       │
//! │  receives the serialized form and switches on `code`.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use scanvault_cloud::CloudError;
use scanvault_core::validation::FormErrors;
use scanvault_core::{AuthError, CoreError, PermissionError, PersistenceError, ValidationError};
use scanvault_db::DbError;
use serde::Serialize;

/// Error returned from application commands.
///
/// ```json
/// {
///   "code": "AUTH_FAILED",
///   "message": "Invalid email or password"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed
    ValidationError,

    /// The identity provider rejected the request
    AuthFailed,

    /// The action needs a signed-in user
    NotSignedIn,

    /// Camera access refused
    PermissionDenied,

    /// The record store failed
    StorageError,

    /// Local database failure
    DatabaseError,

    /// A remote service could not be reached
    NetworkError,

    /// Missing or invalid configuration
    ConfigError,

    /// Action not allowed in the current state
    BusinessLogic,

    /// Internal error
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn not_signed_in() -> Self {
        AuthError::NotSignedIn.into()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotSignedIn => ApiError::new(ErrorCode::NotSignedIn, err.to_string()),
            AuthError::Network(_) => ApiError::new(ErrorCode::NetworkError, err.to_string()),
            other => ApiError::new(ErrorCode::AuthFailed, other.to_string()),
        }
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        ApiError::new(ErrorCode::StorageError, err.to_string())
    }
}

impl From<PermissionError> for ApiError {
    fn from(err: PermissionError) -> Self {
        ApiError::new(ErrorCode::PermissionDenied, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Joins every field message, e.g. "Email can't be empty; Password can't be empty".
impl From<FormErrors> for ApiError {
    fn from(errors: FormErrors) -> Self {
        let message = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        ApiError::validation(message)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidTransition { .. } => {
                ApiError::new(ErrorCode::BusinessLogic, err.to_string())
            }
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", other);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CloudError> for ApiError {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::MissingConfig(_) | CloudError::InvalidUrl(_) => {
                ApiError::new(ErrorCode::ConfigError, err.to_string())
            }
            ref e if e.is_transport() => ApiError::new(ErrorCode::NetworkError, err.to_string()),
            other => ApiError::new(ErrorCode::Internal, other.to_string()),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

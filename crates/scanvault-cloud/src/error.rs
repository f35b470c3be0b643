//! # Cloud Error Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cloud Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Provider            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  MissingConfig  │  │  Http           │  │  Provider{status,code}  │ │
//! │  │  InvalidUrl     │  │                 │  │  Decode                 │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │  Local session  │   CloudError ──► AuthError        (identity)      │
//! │  │  Io / Json      │   CloudError ──► PersistenceError (record store)  │
//! │  │  NotSignedIn    │                                                   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use scanvault_core::{AuthError, PersistenceError};
use thiserror::Error;

/// Result type alias for cloud operations.
pub type CloudResult<T> = Result<T, CloudError>;

#[derive(Debug, Error)]
pub enum CloudError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// A required environment variable is absent or empty.
    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // =========================================================================
    // Provider Errors
    // =========================================================================
    /// The service answered with an error body.
    ///
    /// `message` is the provider's code, e.g. `EMAIL_NOT_FOUND` or
    /// `WEAK_PASSWORD : Password should be at least 6 characters`.
    #[error("Provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    /// A response body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    // =========================================================================
    // Local Session Errors
    // =========================================================================
    #[error("No signed-in user")]
    NotSignedIn,

    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Provider code without the human-readable suffix.
    pub fn provider_code(&self) -> Option<&str> {
        match self {
            CloudError::Provider { message, .. } => {
                Some(message.split(" : ").next().unwrap_or(message).trim())
            }
            _ => None,
        }
    }

    /// Whether the request failed before a response was obtained.
    pub fn is_transport(&self) -> bool {
        matches!(self, CloudError::Http(e) if !e.is_decode())
    }

    fn status(&self) -> Option<u16> {
        match self {
            CloudError::Provider { status, .. } => Some(*status),
            CloudError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Maps to the record-store contract error for a failed write.
    pub fn into_write_error(self) -> PersistenceError {
        self.into_persistence_error(PersistenceError::WriteFailed)
    }

    /// Maps to the record-store contract error for a failed read.
    pub fn into_read_error(self) -> PersistenceError {
        self.into_persistence_error(PersistenceError::ReadFailed)
    }

    fn into_persistence_error(self, other: fn(String) -> PersistenceError) -> PersistenceError {
        let message = self.to_string();
        match self.status() {
            Some(401 | 403) => PersistenceError::Unauthorized(message),
            Some(status) if status >= 500 => PersistenceError::Unavailable(message),
            _ if matches!(self, CloudError::NotSignedIn) => PersistenceError::Unauthorized(message),
            _ if self.is_transport() => PersistenceError::Unavailable(message),
            _ => other(message),
        }
    }
}

/// Maps a provider error code to the identity taxonomy.
///
/// Codes may carry a suffix (`WEAK_PASSWORD : …`), so prefixes are matched.
pub fn auth_error_from_code(code: &str) -> AuthError {
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            AuthError::InvalidCredentials
        }
        "EMAIL_EXISTS" => AuthError::EmailAlreadyInUse,
        "INVALID_EMAIL" => AuthError::InvalidEmail,
        c if c.starts_with("WEAK_PASSWORD") => AuthError::WeakPassword,
        c if c.starts_with("TOO_MANY_ATTEMPTS_TRY_LATER") => AuthError::TooManyAttempts,
        other => AuthError::Provider(other.to_string()),
    }
}

impl From<CloudError> for AuthError {
    fn from(err: CloudError) -> Self {
        if let Some(code) = err.provider_code() {
            return auth_error_from_code(code);
        }
        match err {
            CloudError::NotSignedIn => AuthError::NotSignedIn,
            CloudError::Http(e) if e.is_decode() => AuthError::Provider(e.to_string()),
            CloudError::Http(e) => AuthError::Network(e.to_string()),
            other => AuthError::Provider(other.to_string()),
        }
    }
}

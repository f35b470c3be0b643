//! # Firebase Configuration
//!
//! Project settings read from the process environment at startup.
//!
//! ```text
//! ┌──────────────────────────────────┬──────────┬──────────────────────────┐
//! │ Variable                         │ Required │ Used for                 │
//! ├──────────────────────────────────┼──────────┼──────────────────────────┤
//! │ FIREBASE_API_KEY                 │ yes      │ Identity Toolkit `key=`  │
//! │ FIREBASE_AUTH_DOMAIN             │ yes      │ logged only              │
//! │ FIREBASE_PROJECT_ID              │ yes      │ Firestore document path  │
//! │ FIREBASE_STORAGE_BUCKET          │ yes      │ logged only              │
//! │ FIREBASE_MESSAGING_SENDER_ID     │ yes      │ logged only              │
//! │ FIREBASE_APP_ID                  │ yes      │ logged only              │
//! │ FIREBASE_MEASUREMENT_ID          │ no       │ logged only              │
//! └──────────────────────────────────┴──────────┴──────────────────────────┘
//! ```
//!
//! A missing or empty required variable fails startup with
//! [`CloudError::MissingConfig`] naming the variable.

use url::Url;

use crate::error::{CloudError, CloudResult};

pub const ENV_API_KEY: &str = "FIREBASE_API_KEY";
pub const ENV_AUTH_DOMAIN: &str = "FIREBASE_AUTH_DOMAIN";
pub const ENV_PROJECT_ID: &str = "FIREBASE_PROJECT_ID";
pub const ENV_STORAGE_BUCKET: &str = "FIREBASE_STORAGE_BUCKET";
pub const ENV_MESSAGING_SENDER_ID: &str = "FIREBASE_MESSAGING_SENDER_ID";
pub const ENV_APP_ID: &str = "FIREBASE_APP_ID";
pub const ENV_MEASUREMENT_ID: &str = "FIREBASE_MEASUREMENT_ID";

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com";
const FIRESTORE_URL: &str = "https://firestore.googleapis.com";

// =============================================================================
// Project Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    pub measurement_id: Option<String>,
}

impl FirebaseConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> CloudResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> CloudResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required =
            |name: &str| optional(name).ok_or_else(|| CloudError::MissingConfig(name.to_string()));

        Ok(FirebaseConfig {
            api_key: required(ENV_API_KEY)?,
            auth_domain: required(ENV_AUTH_DOMAIN)?,
            project_id: required(ENV_PROJECT_ID)?,
            storage_bucket: required(ENV_STORAGE_BUCKET)?,
            messaging_sender_id: required(ENV_MESSAGING_SENDER_ID)?,
            app_id: required(ENV_APP_ID)?,
            measurement_id: optional(ENV_MEASUREMENT_ID),
        })
    }
}

// =============================================================================
// Endpoints
// =============================================================================

/// Base URLs of the three REST services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseEndpoints {
    pub identity_toolkit: Url,
    pub secure_token: Url,
    pub firestore: Url,
}

impl FirebaseEndpoints {
    /// The hosted Google endpoints.
    pub fn production() -> CloudResult<Self> {
        Self::parse(IDENTITY_TOOLKIT_URL, SECURE_TOKEN_URL, FIRESTORE_URL)
    }

    pub fn parse(identity_toolkit: &str, secure_token: &str, firestore: &str) -> CloudResult<Self> {
        let parse =
            |s: &str| Url::parse(s).map_err(|e| CloudError::InvalidUrl(format!("{s}: {e}")));
        Ok(FirebaseEndpoints {
            identity_toolkit: parse(identity_toolkit)?,
            secure_token: parse(secure_token)?,
            firestore: parse(firestore)?,
        })
    }

    /// Routes every service to one base URL (emulators, mock servers).
    pub fn single(base: &str) -> CloudResult<Self> {
        Self::parse(base, base, base)
    }

    /// Builds `{base}{path}` with `key=` appended.
    pub(crate) fn with_key(base: &Url, path: &str, api_key: &str) -> CloudResult<Url> {
        let mut url = join(base, path)?;
        url.query_pairs_mut().append_pair("key", api_key);
        Ok(url)
    }
}

/// Appends `path` to `base`, keeping any path prefix `base` already has.
pub(crate) fn join(base: &Url, path: &str) -> CloudResult<Url> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| CloudError::InvalidUrl(format!("{joined}: {e}")))
}

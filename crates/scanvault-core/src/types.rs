//! # Domain Types
//!
//! Core domain types used throughout ScanVault.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    UserRef      │   │   ScanRecord    │   │   DecodedCode   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  uid (stable)   │   │  id (opaque)    │   │  payload        │       │
//! │  │  email          │   │  payload        │   │  symbology      │       │
//! │  └─────────────────┘   │  saved_at       │   └─────────────────┘       │
//! │                        │  owner_id ──────┼──► UserRef.uid              │
//! │  ┌─────────────────┐   └─────────────────┘   ┌─────────────────┐       │
//! │  │   Credentials   │                         │PermissionStatus │       │
//! │  │  email/password │                         │ Undetermined    │       │
//! │  └─────────────────┘                         │ Granted/Denied  │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// User Reference
// =============================================================================

/// Opaque handle to an identity-provider user.
///
/// Only `uid` is relied upon; it scopes every stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserRef {
    /// Stable unique id assigned by the identity provider.
    pub uid: String,

    /// Email the account was registered with, when the provider reports it.
    pub email: Option<String>,
}

impl UserRef {
    /// Creates a reference with only a uid.
    pub fn new(uid: impl Into<String>) -> Self {
        UserRef {
            uid: uid.into(),
            email: None,
        }
    }

    /// Attaches the account email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Email and password that passed form validation.
///
/// Only [`crate::validation::AuthForm::validate`] hands these out, so holding
/// one means the local checks already ran.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Scan Record
// =============================================================================

/// A saved scan.
///
/// Created when a user chooses to save a decoded code; never updated or
/// deleted afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    /// Opaque id assigned by the record store.
    pub id: String,

    /// Decoded text of the QR code.
    pub payload: String,

    /// When the record was saved.
    #[ts(as = "String")]
    pub saved_at: DateTime<Utc>,

    /// `UserRef::uid` of the owner.
    pub owner_id: String,
}

/// Orders records newest first.
///
/// Records with identical timestamps keep their relative order, so a store
/// that lists in insertion order and then calls this yields a stable result.
pub fn sort_newest_first(records: &mut [ScanRecord]) {
    records.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
}

// =============================================================================
// Decoder Output
// =============================================================================

/// Barcode symbologies a decoder may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    Qr,
    Ean13,
    Ean8,
    Code128,
    DataMatrix,
    Other,
}

/// A code reported by the external barcode decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DecodedCode {
    pub payload: String,
    pub symbology: Symbology,
}

impl DecodedCode {
    /// Convenience constructor for a QR decode.
    pub fn qr(payload: impl Into<String>) -> Self {
        DecodedCode {
            payload: payload.into(),
            symbology: Symbology::Qr,
        }
    }

    /// Whether this decode is one the scanner accepts.
    pub fn is_qr(&self) -> bool {
        self.symbology == Symbology::Qr
    }
}

// =============================================================================
// Camera Permission
// =============================================================================

/// State of the camera permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    /// Never asked.
    #[default]
    Undetermined,
    Granted,
    Denied,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, secs: i64) -> ScanRecord {
        ScanRecord {
            id: id.to_string(),
            payload: format!("payload-{id}"),
            saved_at: Utc.timestamp_opt(secs, 0).unwrap(),
            owner_id: "U1".to_string(),
        }
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("a@b.co", "hunter22");
        let shown = format!("{creds:?}");
        assert!(shown.contains("a@b.co"));
        assert!(!shown.contains("hunter22"));
    }

    #[test]
    fn test_sort_newest_first() {
        let mut records = vec![record("a", 10), record("b", 30), record("c", 20)];
        sort_newest_first(&mut records);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn test_scan_record_serializes_camel_case() {
        let json = serde_json::to_value(record("a", 0)).unwrap();
        assert!(json.get("savedAt").is_some());
        assert!(json.get("ownerId").is_some());
    }

    #[test]
    fn test_decoded_code_qr() {
        assert!(DecodedCode::qr("https://example.com").is_qr());
        let ean = DecodedCode {
            payload: "4006381333931".to_string(),
            symbology: Symbology::Ean13,
        };
        assert!(!ean.is_qr());
    }

    #[test]
    fn test_permission_default_is_undetermined() {
        assert_eq!(PermissionStatus::default(), PermissionStatus::Undetermined);
    }
}

//! # scanvault-cloud: Identity and Document Store Adapters
//!
//! REST adapters for the hosted services ScanVault depends on.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   SessionStore (app)                      ScanController / StorageView  │
//! │        │ subscribe / sign_in / sign_out            │ save / list        │
//! │        ▼                                           ▼                    │
//! │   IdentityGateway ──► dyn IdentityProvider    dyn RecordStore           │
//! │                              │                     │                    │
//! │                              ▼                     ▼                    │
//! │                        FirebaseAuth ──token──► FirestoreRecordStore     │
//! │                         │         │                │                    │
//! │          accounts:signIn…    session.json     documents / runQuery      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`config`] - `FIREBASE_*` environment configuration and endpoints
//! - [`identity`] - Identity gateway and provider trait
//! - [`firebase_auth`] - Firebase Identity Toolkit provider
//! - [`credentials`] - Persisted provider session
//! - [`firestore`] - Firestore record store
//! - [`error`] - `CloudError`

pub mod config;
pub mod credentials;
pub mod error;
pub mod firebase_auth;
pub mod firestore;
pub mod identity;

pub use config::{FirebaseConfig, FirebaseEndpoints};
pub use credentials::{CredentialStore, PersistedSession};
pub use error::{CloudError, CloudResult};
pub use firebase_auth::{FirebaseAuth, TokenSource};
pub use firestore::FirestoreRecordStore;
pub use identity::{IdentityGateway, IdentityProvider, IdentityState, IdentitySubscription};

//! # scanvault-core: Pure Logic for ScanVault
//!
//! This crate holds every piece of ScanVault logic that can be expressed
//! without touching the outside world. Identity checks, barcode decoding and
//! document queries all live behind gateways in other crates; what remains
//! here are the state machines and rules that decide what those gateways are
//! asked to do.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ScanVault Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Front-end (terminal shell / mobile view)           │   │
//! │  │     Splash ──► Auth ──► Scanner ──► Storage                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 apps/scanvault (state + commands)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ scanvault-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌────────────┐       │   │
//! │  │  │ session  │ │   scan   │ │ navigation │ │ validation │       │   │
//! │  │  │ Loading  │ │ Scanning │ │  route()   │ │ AuthForm   │       │   │
//! │  │  │ SignedIn │ │ Decoded  │ │ Navigator  │ │ FormErrors │       │   │
//! │  │  └──────────┘ └──────────┘ └────────────┘ └────────────┘       │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        scanvault-db / scanvault-cloud (gateways)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (UserRef, ScanRecord, Credentials, DecodedCode)
//! - [`session`] - Session state machine (Loading / SignedOut / SignedIn)
//! - [`scan`] - Scan capture state machine
//! - [`navigation`] - Screen routing and screen generations
//! - [`validation`] - Auth form validation
//! - [`error`] - Error taxonomy shared by every crate
//!
//! ## Example Usage
//!
//! ```rust
//! use scanvault_core::navigation::{route, Screen};
//! use scanvault_core::session::{Session, SessionEvent};
//! use scanvault_core::UserRef;
//!
//! let mut session = Session::new();
//! assert_eq!(route(&session), Screen::Splash);
//!
//! session
//!     .apply(SessionEvent::Restore(Some(UserRef::new("U1"))))
//!     .unwrap();
//! assert_eq!(route(&session), Screen::Scanner);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod navigation;
pub mod scan;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{AuthError, CoreError, PermissionError, PersistenceError, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Document collection holding scan records.
pub const SCANS_COLLECTION: &str = "scans";

/// Minimum password length accepted at sign-up.
///
/// Matches the identity provider's own minimum so weak passwords are caught
/// before a network round trip.
pub const MIN_PASSWORD_LEN: usize = 6;

//! # scanvault-db: Record Store for ScanVault
//!
//! This crate owns the record-store contract ([`RecordStore`]) and the local
//! vault implementation of it on top of SQLite.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ScanVault Data Flow                              │
//! │                                                                         │
//! │  Scanner "Save" / Storage screen mount                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  dyn RecordStore ──────────────┬────────────────────────────┐          │
//! │                                │                            │          │
//! │  ┌─────────────────────────────▼───────────────────┐  ┌─────▼───────┐  │
//! │  │               scanvault-db (THIS CRATE)         │  │ Firestore   │  │
//! │  │                                                 │  │ (scanvault- │  │
//! │  │   ┌───────────────┐    ┌───────────────┐       │  │  cloud)     │  │
//! │  │   │   Database    │    │ ScanRepository│       │  └─────────────┘  │
//! │  │   │   (pool.rs)   │◄───│ insert        │       │                   │
//! │  │   │ SqlitePool    │    │ list_by_owner │       │                   │
//! │  │   └───────────────┘    └───────────────┘       │                   │
//! │  │          │  migrations/sqlite/001_initial_schema.sql               │
//! │  └──────────┼──────────────────────────────────────┘                   │
//! │             ▼                                                           │
//! │       scanvault.db (platform data dir)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`store`] - The `RecordStore` trait every backend implements
//! - [`pool`] - Connection pool and `Database` handle
//! - [`repository`] - SQL for scan records
//! - [`migrations`] - Embedded schema migrations
//! - [`error`] - `DbError` and its mapping to `PersistenceError`

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::scan::ScanRepository;
pub use store::RecordStore;

//! # Repository Module
//!
//! SQL access for the local vault.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RecordStore (trait)                                                    │
//! │       │                                                                 │
//! │       │  db.scans().insert_now("U1", "https://example.com")            │
//! │       ▼                                                                 │
//! │  ScanRepository                                                        │
//! │  ├── insert(&self, owner_id, payload, saved_at)                        │
//! │  ├── insert_now(&self, owner_id, payload)                              │
//! │  ├── list_by_owner(&self, owner_id)                                    │
//! │  └── count_by_owner(&self, owner_id)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  scan_records table                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`scan::ScanRepository`] - Append-only scan records

pub mod scan;

//! # State Module
//!
//! Long-lived application state, one type per concern.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────────┐  │
//! │  │   SessionStore   │  │   RecordsState   │  │     AppConfig        │  │
//! │  │                  │  │                  │  │                      │  │
//! │  │  Mutex<Session>  │  │  Arc<dyn         │  │  backend             │  │
//! │  │  watch feed      │  │   RecordStore>   │  │  data_dir            │  │
//! │  │  listener task   │  │                  │  │  collection, camera  │  │
//! │  └──────────────────┘  └──────────────────┘  └──────────────────────┘  │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • SessionStore: one Mutex serializes every transition                 │
//! │  • RecordsState: backends are Send + Sync                              │
//! │  • AppConfig: read-only after initialization                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
mod records;
mod session;

pub use config::{AppConfig, CameraMode, ConfigError, Overrides, StorageBackend};
pub use records::RecordsState;
pub use session::SessionStore;

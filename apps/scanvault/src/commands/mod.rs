//! # Commands Module
//!
//! Screen controllers. Each one holds only the state its screen needs and
//! returns `Result<_, ApiError>` to whichever front-end drives it.
//!
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (exports)
//! ├── auth.rs     ◄─── Login / sign-up form
//! ├── scan.rs     ◄─── Scanner: permission, decode, save, open
//! └── storage.rs  ◄─── Saved codes list
//! ```
//!
//! ## State Injection
//! ```rust,ignore
//! // Needs the session only
//! screen.submit(&session_store).await?;
//!
//! // Needs the session snapshot plus services fixed at construction
//! scanner.choose(ScanAction::Save, &session_store.snapshot()).await?;
//!
//! // Needs a record store and the session snapshot
//! view.mount_and_load(records.store().as_ref(), &session).await;
//! ```

pub mod auth;
pub mod scan;
pub mod storage;

pub use auth::AuthScreen;
pub use scan::{ActionReport, Alert, Capture, ScanController};
pub use storage::{ListState, StorageView};

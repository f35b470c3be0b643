//! # Record Store Contract
//!
//! The gateway the scanner and storage screens talk to.
//!
//! ```text
//!   ScanController ──save(owner, payload)──►┐
//!                                           ├──► dyn RecordStore
//!   StorageView ──list_by_owner(owner)─────►┘        │
//!                                          ┌─────────┴──────────┐
//!                                          ▼                    ▼
//!                                     Database            FirestoreRecordStore
//!                                   (local vault)         (scanvault-cloud)
//! ```
//!
//! Contract for every implementation:
//! - `save` never deduplicates and never retries.
//! - `list_by_owner` returns only records whose `owner_id` equals the
//!   argument, newest first, ties broken by most recent insertion.

use async_trait::async_trait;
use scanvault_core::error::PersistenceResult;
use scanvault_core::ScanRecord;
use tracing::warn;

use crate::pool::Database;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Stores one record and returns its id.
    async fn save(&self, owner_id: &str, payload: &str) -> PersistenceResult<String>;

    /// Lists the owner's records, newest first.
    async fn list_by_owner(&self, owner_id: &str) -> PersistenceResult<Vec<ScanRecord>>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

#[async_trait]
impl RecordStore for Database {
    async fn save(&self, owner_id: &str, payload: &str) -> PersistenceResult<String> {
        self.scans()
            .insert_now(owner_id, payload)
            .await
            .map(|record| record.id)
            .map_err(|e| {
                warn!(error = %e, "Local save failed");
                e.into_write_error()
            })
    }

    async fn list_by_owner(&self, owner_id: &str) -> PersistenceResult<Vec<ScanRecord>> {
        self.scans().list_by_owner(owner_id).await.map_err(|e| {
            warn!(error = %e, "Local list failed");
            e.into_read_error()
        })
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

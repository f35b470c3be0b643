//! # Storage Commands
//!
//! The saved-codes screen: one list per mount, newest first.
//!
//! ```text
//!   mount() ──► token ──► RecordStore::list_by_owner(uid) ──► apply(token, result)
//!                                                               │
//!                         screen unmounted or remounted? ───────┤ yes: dropped
//!                                                               │ no:  Ready / Failed
//! ```
//!
//! A list that finishes after the user left the screen must never repaint a
//! newer instance of it, so every result carries the [`EpochToken`] of the
//! mount that asked for it.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use scanvault_core::navigation::{EpochToken, ScreenEpoch};
use scanvault_core::session::Session;
use scanvault_core::ScanRecord;
use scanvault_db::RecordStore;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::platform::UrlOpener;

pub const EMPTY_MESSAGE: &str = "Storage is empty";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ListState {
    #[default]
    Loading,
    Ready(Vec<ScanRecord>),
    Failed(ApiError),
}

#[derive(Debug, Default)]
pub struct StorageView {
    epoch: ScreenEpoch,
    list: ListState,
}

impl StorageView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &ListState {
        &self.list
    }

    /// Mounts a fresh instance. Earlier in-flight lists become stale.
    pub fn mount(&mut self) -> EpochToken {
        self.list = ListState::Loading;
        self.epoch.mount()
    }

    pub fn unmount(&mut self) {
        self.epoch.unmount();
    }

    /// Applies a finished list. Returns `false` if the result was stale.
    pub fn apply(&mut self, token: EpochToken, result: Result<Vec<ScanRecord>, ApiError>) -> bool {
        if !self.epoch.is_current(token) {
            debug!("Discarding stale storage list");
            return false;
        }
        self.list = match result {
            Ok(records) => ListState::Ready(records),
            Err(e) => ListState::Failed(e),
        };
        true
    }

    /// Mounts and loads in one step.
    pub async fn mount_and_load(&mut self, records: &dyn RecordStore, session: &Session) -> bool {
        let token = self.mount();
        let result = fetch(records, session).await;
        self.apply(token, result)
    }

    /// Record at a 1-based position in the displayed list.
    pub fn select(&self, position: usize) -> Option<&ScanRecord> {
        match &self.list {
            ListState::Ready(records) => position.checked_sub(1).and_then(|i| records.get(i)),
            _ => None,
        }
    }

    /// Opens a confirmed selection.
    pub async fn open(
        &self,
        record: &ScanRecord,
        opener: &Arc<dyn UrlOpener>,
    ) -> Result<(), ApiError> {
        opener.open(&record.payload).await.map_err(|e| {
            warn!(error = %e, "Could not open payload");
            ApiError::internal(format!("Could not open {}: {e}", record.payload))
        })
    }
}

/// Lists the signed-in user's records.
pub async fn fetch(
    records: &dyn RecordStore,
    session: &Session,
) -> Result<Vec<ScanRecord>, ApiError> {
    let owner_id = session.owner_id().ok_or_else(ApiError::not_signed_in)?;
    let list = records.list_by_owner(owner_id).await?;
    info!(count = list.len(), backend = records.backend(), "Storage listed");
    Ok(list)
}

/// `Saved: <date>` line shown under each payload, in local time.
pub fn saved_label(saved_at: DateTime<Utc>) -> String {
    format!(
        "Saved: {}",
        saved_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    )
}

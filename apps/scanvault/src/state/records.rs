//! # Record Store State
//!
//! Holds the record store backend chosen at startup.
//!
//! ## Backends
//! ```text
//!   backend = "firestore"  ──► FirestoreRecordStore (bearer token from FirebaseAuth)
//!   backend = "sqlite"     ──► Database at <data dir>/scanvault.db
//! ```
//!
//! Commands only see `Arc<dyn RecordStore>`, so either backend can sit
//! behind the scanner and storage screens.

use std::sync::Arc;

use scanvault_cloud::{FirebaseConfig, FirebaseEndpoints, FirestoreRecordStore, TokenSource};
use scanvault_db::{Database, DbConfig, RecordStore};
use tracing::info;

use crate::error::ApiError;
use crate::state::config::AppConfig;

/// The active record store.
#[derive(Clone)]
pub struct RecordsState {
    store: Arc<dyn RecordStore>,
    database: Option<Database>,
}

impl RecordsState {
    /// Opens (and migrates) the local vault.
    pub async fn local(config: &AppConfig) -> Result<Self, ApiError> {
        let db = Database::new(DbConfig::new(config.database_path())).await?;
        info!(path = %config.database_path().display(), "Local vault opened");
        Ok(Self::from_database(db))
    }

    pub fn from_database(db: Database) -> Self {
        RecordsState {
            store: Arc::new(db.clone()),
            database: Some(db),
        }
    }

    /// Connects to the Firestore collection named in `config`.
    pub fn firestore(
        config: &AppConfig,
        firebase: &FirebaseConfig,
        endpoints: &FirebaseEndpoints,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, ApiError> {
        let store = FirestoreRecordStore::new(firebase, endpoints, tokens)?
            .with_collection(config.collection.clone());
        info!(collection = %config.collection, "Firestore record store configured");
        Ok(Self::from_store(Arc::new(store)))
    }

    pub fn from_store(store: Arc<dyn RecordStore>) -> Self {
        RecordsState {
            store,
            database: None,
        }
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        Arc::clone(&self.store)
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Closes the local pool, if any.
    pub async fn close(&self) {
        if let Some(db) = &self.database {
            db.close().await;
        }
    }
}

impl std::fmt::Debug for RecordsState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordsState")
            .field("backend", &self.backend())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::config::{FileConfig, Overrides};

    #[tokio::test]
    async fn test_local_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::resolve(
            FileConfig::default(),
            |_| None,
            &Overrides::default(),
            Some(dir.path().to_path_buf()),
        )
        .unwrap();

        let records = RecordsState::local(&config).await.unwrap();
        assert_eq!(records.backend(), "sqlite");

        let store = records.store();
        store.save("U1", "https://example.com").await.unwrap();
        assert_eq!(store.list_by_owner("U1").await.unwrap().len(), 1);
        assert!(config.database_path().exists());

        records.close().await;
    }
}

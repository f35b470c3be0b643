//! # Persisted Provider Session
//!
//! Keeps the provider refresh token across restarts so a returning user
//! lands on the scanner without signing in again.
//!
//! ```text
//!   <data dir>/session.json
//!   {
//!     "uid": "U1",
//!     "email": "ada@example.com",
//!     "refresh_token": "AMf-vB…"
//!   }
//! ```
//!
//! Written atomically (temp file + rename). On Unix the file is readable by
//! the owner only.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CloudResult;

pub const SESSION_FILE: &str = "session.json";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    pub refresh_token: String,
}

impl std::fmt::Debug for PersistedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedSession")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// File-backed storage for one [`PersistedSession`].
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Stores the session as `session.json` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        CredentialStore {
            path: dir.as_ref().join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored session. A missing file is `Ok(None)`.
    pub async fn load(&self) -> CloudResult<Option<PersistedSession>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let session = serde_json::from_slice(&bytes)?;
                debug!(path = %self.path.display(), "Loaded persisted session");
                Ok(Some(session))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, session: &PersistedSession) -> CloudResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(session)?).await?;
        restrict_permissions(&tmp).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        info!(uid = %session.uid, "Persisted provider session");
        Ok(())
    }

    /// Deletes the stored session. Deleting a missing file succeeds.
    pub async fn clear(&self) -> CloudResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Cleared persisted session");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudError;

    fn sample() -> PersistedSession {
        PersistedSession {
            uid: "U1".to_string(),
            email: Some("ada@example.com".to_string()),
            refresh_token: "refresh-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::in_dir(dir.path());
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::in_dir(dir.path().join("nested"));

        store.save(&sample()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(sample()));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::in_dir(dir.path());
        std::fs::write(store.path(), b"not json").unwrap();

        assert!(matches!(store.load().await, Err(CloudError::Json(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::in_dir(dir.path());
        store.save(&sample()).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_debug_hides_refresh_token() {
        assert!(!format!("{:?}", sample()).contains("refresh-1"));
    }
}

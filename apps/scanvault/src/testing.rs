//! In-memory stand-ins for the external services, used by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use scanvault_cloud::{IdentityGateway, IdentityProvider};
use scanvault_core::error::{AuthResult, PersistenceResult};
use scanvault_core::{
    sort_newest_first, AuthError, Credentials, DecodedCode, PersistenceError, ScanRecord, UserRef,
};
use scanvault_db::RecordStore;

use crate::platform::{BarcodeDecoder, DecoderEvent, UrlOpener};
use crate::state::SessionStore;

// =============================================================================
// Identity
// =============================================================================

#[derive(Default)]
pub struct FakeIdentity {
    restored: Option<UserRef>,
    accounts: Mutex<Vec<(String, String, UserRef)>>,
    fail_sign_out: AtomicBool,
}

impl FakeIdentity {
    pub fn restoring(user: UserRef) -> Self {
        FakeIdentity {
            restored: Some(user),
            ..Default::default()
        }
    }

    pub fn with_account(email: &str, password: &str) -> Self {
        let identity = FakeIdentity::default();
        identity.add_account(email, password);
        identity
    }

    fn add_account(&self, email: &str, password: &str) -> UserRef {
        let mut accounts = self.accounts.lock().unwrap();
        let user = UserRef::new(format!("U{}", accounts.len() + 1)).with_email(email);
        accounts.push((email.to_string(), password.to_string(), user.clone()));
        user
    }

    pub fn fail_sign_out(&self) {
        self.fail_sign_out.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_in(&self, credentials: &Credentials) -> AuthResult<UserRef> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|(email, password, _)| {
                *email == credentials.email && *password == credentials.password
            })
            .map(|(_, _, user)| user.clone())
            .ok_or(AuthError::InvalidCredentials)
    }

    async fn sign_up(&self, credentials: &Credentials) -> AuthResult<UserRef> {
        let exists = self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .any(|(email, _, _)| *email == credentials.email);
        if exists {
            return Err(AuthError::EmailAlreadyInUse);
        }
        Ok(self.add_account(&credentials.email, &credentials.password))
    }

    async fn sign_out(&self) -> AuthResult<()> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            Err(AuthError::Network("offline".to_string()))
        } else {
            Ok(())
        }
    }

    async fn restore(&self) -> AuthResult<Option<UserRef>> {
        Ok(self.restored.clone())
    }
}

/// A started, resolved session store backed by `identity`.
pub async fn session_store(identity: FakeIdentity) -> SessionStore {
    let gateway = Arc::new(IdentityGateway::new(Arc::new(identity)));
    let store = SessionStore::new(gateway);
    store.start().await;
    store.resolved().await;
    store
}

// =============================================================================
// Record Store
// =============================================================================

#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<ScanRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryRecordStore {
    pub fn failing() -> Self {
        let store = MemoryRecordStore::default();
        store.fail_writes.store(true, Ordering::SeqCst);
        store
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn save(&self, owner_id: &str, payload: &str) -> PersistenceResult<String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::WriteFailed("disk full".to_string()));
        }
        let mut records = self.records.lock().unwrap();
        let n = records.len();
        let id = format!("r{}", n + 1);
        let base = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        records.push(ScanRecord {
            id: id.clone(),
            payload: payload.to_string(),
            saved_at: base + Duration::minutes(n as i64),
            owner_id: owner_id.to_string(),
        });
        Ok(id)
    }

    async fn list_by_owner(&self, owner_id: &str) -> PersistenceResult<Vec<ScanRecord>> {
        let mut records: Vec<_> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

// =============================================================================
// Platform
// =============================================================================

#[derive(Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl UrlOpener for RecordingOpener {
    async fn open(&self, target: &str) -> std::io::Result<()> {
        self.opened.lock().unwrap().push(target.to_string());
        Ok(())
    }
}

/// Yields the queued codes, then reports exhaustion.
pub struct ScriptedDecoder {
    events: Mutex<VecDeque<DecoderEvent>>,
}

impl ScriptedDecoder {
    pub fn new(codes: impl IntoIterator<Item = DecodedCode>) -> Self {
        Self::events(codes.into_iter().map(DecoderEvent::Code))
    }

    pub fn events(events: impl IntoIterator<Item = DecoderEvent>) -> Self {
        ScriptedDecoder {
            events: Mutex::new(events.into_iter().collect()),
        }
    }
}

#[async_trait]
impl BarcodeDecoder for ScriptedDecoder {
    async fn next_event(&self) -> Option<DecoderEvent> {
        self.events.lock().unwrap().pop_front()
    }
}

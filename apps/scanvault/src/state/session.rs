//! # Session State
//!
//! Owns the [`Session`] for the lifetime of the app.
//!
//! ## Event Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  IdentityGateway ──subscribe()──► listener task                         │
//! │                                     │ 1st resolved snapshot → Restore   │
//! │                                     │ later SignedIn(u)  → SignIn(u)    │
//! │                                     │ later SignedOut    → SignOut      │
//! │                                     ▼                                   │
//! │  sign_in / sign_up / sign_out ──► apply() ──► watch::Sender<Session>    │
//! │  (on success)                        │             │                    │
//! │                                      │             ▼                    │
//! │                             Mutex<Session>    views: watch()/snapshot() │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Credential commands apply their own outcome as soon as the provider
//! answers, and the gateway then echoes the same snapshot through the
//! subscription. The echo is a no-op. Events from both sources go through the
//! one mutex, so they are applied in the order they arrive.

use std::sync::{Arc, Mutex};

use scanvault_cloud::{IdentityGateway, IdentityState, IdentitySubscription};
use scanvault_core::error::{AuthResult, CoreResult};
use scanvault_core::session::{Session, SessionEvent};
use scanvault_core::{Credentials, UserRef};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Runtime owner of the session state machine.
pub struct SessionStore {
    gateway: Arc<IdentityGateway>,
    inner: Arc<Shared>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    session: Mutex<Session>,
    view: watch::Sender<Session>,
}

impl Shared {
    /// Applies one event and publishes the result if it changed anything.
    fn apply(&self, event: SessionEvent) -> CoreResult<bool> {
        let mut session = self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let changed = session.apply(event)?;
        if changed {
            debug!(state = ?session.state(), "Session changed");
            self.view.send_replace(session.clone());
        }
        Ok(changed)
    }

    fn snapshot(&self) -> Session {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SessionStore {
    /// Creates the store in `Loading` and registers its subscription.
    ///
    /// Must be called inside a Tokio runtime. The store stays `Loading` until
    /// the gateway publishes its first resolved snapshot, normally after
    /// [`SessionStore::start`].
    pub fn new(gateway: Arc<IdentityGateway>) -> Self {
        let (view, _) = watch::channel(Session::new());
        let inner = Arc::new(Shared {
            session: Mutex::new(Session::new()),
            view,
        });

        let subscription = gateway.subscribe();
        let listener = tokio::spawn(listen(subscription, Arc::clone(&inner)));

        SessionStore {
            gateway,
            inner,
            listener: Mutex::new(Some(listener)),
        }
    }

    /// Asks the gateway to restore a persisted session.
    pub async fn start(&self) {
        self.gateway.start().await;
    }

    pub fn snapshot(&self) -> Session {
        self.inner.snapshot()
    }

    /// Receiver that sees every published session change.
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.inner.view.subscribe()
    }

    /// Waits until the session has left `Loading`.
    pub async fn resolved(&self) -> Session {
        let mut rx = self.watch();
        let resolved = match rx.wait_for(|s| !s.is_loading()).await {
            Ok(session) => session.clone(),
            // The sender lives in `self`, so this only happens mid-teardown.
            Err(_) => self.snapshot(),
        };
        resolved
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> AuthResult<UserRef> {
        let user = self.gateway.sign_in(credentials).await?;
        self.record(SessionEvent::SignInSucceeded(user.clone()));
        Ok(user)
    }

    pub async fn sign_up(&self, credentials: &Credentials) -> AuthResult<UserRef> {
        let user = self.gateway.sign_up(credentials).await?;
        self.record(SessionEvent::SignInSucceeded(user.clone()));
        Ok(user)
    }

    /// Signs out. Failures are logged and otherwise ignored.
    pub async fn sign_out(&self) {
        match self.gateway.sign_out().await {
            Ok(()) => self.record(SessionEvent::SignOutCompleted),
            Err(e) => warn!(error = %e, "Sign-out failed, keeping session"),
        }
    }

    /// Tears down the subscription. Later provider changes are not applied.
    pub fn shutdown(&self) {
        let handle = self
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!("Session subscription closed");
        }
    }

    fn record(&self, event: SessionEvent) {
        if let Err(e) = self.inner.apply(event) {
            error!(error = %e, "Rejected session event");
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &self.snapshot())
            .finish_non_exhaustive()
    }
}

/// Translates identity snapshots into session events, in receipt order.
async fn listen(mut subscription: IdentitySubscription, inner: Arc<Shared>) {
    let mut restored = false;

    while let Some(snapshot) = subscription.next().await {
        let event = match snapshot {
            IdentityState::Initializing => continue,
            resolved if !restored => {
                restored = true;
                SessionEvent::Restore(resolved.user().cloned())
            }
            IdentityState::SignedIn(user) => SessionEvent::SignInSucceeded(user),
            IdentityState::SignedOut => SessionEvent::SignOutCompleted,
        };

        match inner.apply(event) {
            Ok(true) => {}
            Ok(false) => debug!("Duplicate identity notification ignored"),
            Err(e) => error!(error = %e, "Rejected identity notification"),
        }
    }

    debug!("Identity feed closed");
}

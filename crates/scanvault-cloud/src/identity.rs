//! # Identity Gateway
//!
//! Request/response front for the identity provider plus a change feed of
//! identity snapshots.
//!
//! ## Snapshot Feed
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   IdentityGateway::new()          state = Initializing                  │
//! │          │                                                              │
//! │          │ start(): provider.restore()                                  │
//! │          ▼                                                              │
//! │   SignedIn(user) / SignedOut      ◄── first resolved snapshot           │
//! │          │                                                              │
//! │          │ sign_in / sign_up / sign_out                                 │
//! │          ▼                                                              │
//! │   SignedIn(user') / SignedOut     ◄── published only when it differs    │
//! │                                                                         │
//! │   subscribe() → IdentitySubscription                                    │
//! │     next(): current snapshot at once, then one item per change          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The feed is a `tokio::sync::watch` channel: a slow subscriber sees the
//! latest snapshot, never a stale backlog.

use std::sync::Arc;

use async_trait::async_trait;
use scanvault_core::error::AuthResult;
use scanvault_core::{Credentials, UserRef};
use tokio::sync::watch;
use tracing::{debug, info, warn};

// =============================================================================
// Provider Contract
// =============================================================================

/// A concrete identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, credentials: &Credentials) -> AuthResult<UserRef>;

    /// Registers a new account and signs it in.
    async fn sign_up(&self, credentials: &Credentials) -> AuthResult<UserRef>;

    async fn sign_out(&self) -> AuthResult<()>;

    /// Restores a previously persisted session, if there is one.
    async fn restore(&self) -> AuthResult<Option<UserRef>>;
}

// =============================================================================
// Snapshots
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdentityState {
    /// The provider has not reported yet.
    #[default]
    Initializing,
    SignedOut,
    SignedIn(UserRef),
}

impl IdentityState {
    pub fn from_user(user: Option<UserRef>) -> Self {
        user.map_or(IdentityState::SignedOut, IdentityState::SignedIn)
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, IdentityState::Initializing)
    }

    pub fn user(&self) -> Option<&UserRef> {
        match self {
            IdentityState::SignedIn(user) => Some(user),
            _ => None,
        }
    }
}

/// Receiving end of the snapshot feed.
#[derive(Debug)]
pub struct IdentitySubscription {
    rx: watch::Receiver<IdentityState>,
    delivered_initial: bool,
}

impl IdentitySubscription {
    /// Waits for the next snapshot.
    ///
    /// The first call returns the current snapshot immediately. Returns
    /// `None` once the gateway is dropped.
    pub async fn next(&mut self) -> Option<IdentityState> {
        if !self.delivered_initial {
            self.delivered_initial = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

// =============================================================================
// Gateway
// =============================================================================

pub struct IdentityGateway {
    provider: Arc<dyn IdentityProvider>,
    state: watch::Sender<IdentityState>,
}

impl IdentityGateway {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(IdentityState::Initializing);
        IdentityGateway { provider, state }
    }

    pub fn subscribe(&self) -> IdentitySubscription {
        IdentitySubscription {
            rx: self.state.subscribe(),
            delivered_initial: false,
        }
    }

    pub fn current(&self) -> IdentityState {
        self.state.borrow().clone()
    }

    /// Asks the provider for a persisted session and publishes the first
    /// resolved snapshot. A failed restore resolves as signed out.
    pub async fn start(&self) {
        let user = match self.provider.restore().await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Session restore failed, starting signed out");
                None
            }
        };
        info!(signed_in = user.is_some(), "Identity resolved");
        self.publish(IdentityState::from_user(user));
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> AuthResult<UserRef> {
        let user = self.provider.sign_in(credentials).await?;
        info!(uid = %user.uid, "Signed in");
        self.publish(IdentityState::SignedIn(user.clone()));
        Ok(user)
    }

    pub async fn sign_up(&self, credentials: &Credentials) -> AuthResult<UserRef> {
        let user = self.provider.sign_up(credentials).await?;
        info!(uid = %user.uid, "Account created");
        self.publish(IdentityState::SignedIn(user.clone()));
        Ok(user)
    }

    /// Signs out. On failure nothing is published.
    pub async fn sign_out(&self) -> AuthResult<()> {
        self.provider.sign_out().await?;
        info!("Signed out");
        self.publish(IdentityState::SignedOut);
        Ok(())
    }

    fn publish(&self, next: IdentityState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if !changed {
            debug!("Identity snapshot unchanged, not published");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

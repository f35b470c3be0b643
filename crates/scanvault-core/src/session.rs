//! # Session State Machine
//!
//! Tracks who (if anyone) is signed in.
//!
//! ## States and Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Session Lifecycle                                │
//! │                                                                         │
//! │                 Restore(None)                                           │
//! │   ┌─────────┐ ─────────────────────► ┌────────────┐                     │
//! │   │ Loading │                        │ SignedOut  │◄──────┐             │
//! │   └─────────┘ ─────────┐             └─────┬──────┘       │             │
//! │                        │                   │              │             │
//! │        Restore(Some(u))│   SignInSucceeded │   SignOutCompleted         │
//! │                        ▼                   ▼              │             │
//! │                     ┌───────────────────────────┐         │             │
//! │                     │      SignedIn(user)       │─────────┘             │
//! │                     └───────────────────────────┘                       │
//! │                                                                         │
//! │  Restore is accepted exactly once, and only while Loading.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The machine is pure. The app's session store owns one instance, feeds it
//! events derived from the identity gateway, and publishes every change.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::UserRef;

// =============================================================================
// State
// =============================================================================

/// Where the session currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", content = "user", rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for the identity provider to report the initial user.
    #[default]
    Loading,
    SignedOut,
    SignedIn(UserRef),
}

impl SessionState {
    fn label(&self) -> &'static str {
        match self {
            SessionState::Loading => "loading",
            SessionState::SignedOut => "signed out",
            SessionState::SignedIn(_) => "signed in",
        }
    }
}

/// Inputs to the session machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Initial identity snapshot, resolved once at startup.
    Restore(Option<UserRef>),
    SignInSucceeded(UserRef),
    SignOutCompleted,
}

impl SessionEvent {
    fn label(&self) -> &'static str {
        match self {
            SessionEvent::Restore(_) => "restore",
            SessionEvent::SignInSucceeded(_) => "sign-in",
            SessionEvent::SignOutCompleted => "sign-out",
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// The session machine.
///
/// `is_signout` records whether the most recent transition into
/// `SignedOut` came from an explicit sign-out, which lets the auth screen
/// animate differently than on a cold start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    state: SessionState,
    is_signout: bool,
}

impl Session {
    /// A fresh session in `Loading`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an event.
    ///
    /// Returns `Ok(true)` when the observable state changed and `Ok(false)`
    /// for an idempotent repeat (signing out twice, or a sign-in for the user
    /// already signed in).
    ///
    /// # Errors
    /// [`CoreError::InvalidTransition`] for `Restore` outside `Loading`.
    pub fn apply(&mut self, event: SessionEvent) -> CoreResult<bool> {
        let next = match (&self.state, event) {
            (SessionState::Loading, SessionEvent::Restore(user)) => Session {
                state: user.map_or(SessionState::SignedOut, SessionState::SignedIn),
                is_signout: false,
            },
            (state, event @ SessionEvent::Restore(_)) => {
                return Err(CoreError::invalid_transition(state.label(), event.label()));
            }
            (_, SessionEvent::SignInSucceeded(user)) => Session {
                state: SessionState::SignedIn(user),
                is_signout: false,
            },
            (_, SessionEvent::SignOutCompleted) => Session {
                state: SessionState::SignedOut,
                is_signout: true,
            },
        };

        if next == *self {
            return Ok(false);
        }
        *self = next;
        Ok(true)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Loading
    }

    pub fn is_signout(&self) -> bool {
        self.is_signout
    }

    /// The signed-in user, if any.
    pub fn user(&self) -> Option<&UserRef> {
        match &self.state {
            SessionState::SignedIn(user) => Some(user),
            _ => None,
        }
    }

    /// Owner id to scope record reads and writes.
    pub fn owner_id(&self) -> Option<&str> {
        self.user().map(|u| u.uid.as_str())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_loading() {
        let session = Session::new();
        assert!(session.is_loading());
        assert!(!session.is_signout());
        assert!(session.user().is_none());
    }

    #[test]
    fn test_restore_with_user() {
        let mut session = Session::new();
        assert!(session
            .apply(SessionEvent::Restore(Some(UserRef::new("U1"))))
            .unwrap());
        assert_eq!(session.owner_id(), Some("U1"));
        assert!(!session.is_signout());
    }

    #[test]
    fn test_restore_without_user() {
        let mut session = Session::new();
        session.apply(SessionEvent::Restore(None)).unwrap();
        assert_eq!(session.state(), &SessionState::SignedOut);
        assert!(!session.is_signout());
    }

    #[test]
    fn test_restore_twice_is_rejected() {
        let mut session = Session::new();
        session.apply(SessionEvent::Restore(None)).unwrap();
        let err = session
            .apply(SessionEvent::Restore(Some(UserRef::new("U1"))))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(session.state(), &SessionState::SignedOut);
    }

    #[test]
    fn test_sign_in_then_sign_out() {
        let mut session = Session::new();
        session.apply(SessionEvent::Restore(None)).unwrap();
        session
            .apply(SessionEvent::SignInSucceeded(UserRef::new("U2")))
            .unwrap();
        assert_eq!(session.owner_id(), Some("U2"));
        assert!(!session.is_signout());

        session.apply(SessionEvent::SignOutCompleted).unwrap();
        assert!(session.user().is_none());
        assert!(session.is_signout());
    }

    #[test]
    fn test_repeated_events_are_idempotent() {
        let mut session = Session::new();
        session.apply(SessionEvent::Restore(None)).unwrap();
        session.apply(SessionEvent::SignOutCompleted).unwrap();
        assert!(!session.apply(SessionEvent::SignOutCompleted).unwrap());

        session
            .apply(SessionEvent::SignInSucceeded(UserRef::new("U1")))
            .unwrap();
        assert!(!session
            .apply(SessionEvent::SignInSucceeded(UserRef::new("U1")))
            .unwrap());
    }

    #[test]
    fn test_sign_in_while_loading_skips_restore() {
        let mut session = Session::new();
        session
            .apply(SessionEvent::SignInSucceeded(UserRef::new("U1")))
            .unwrap();
        assert_eq!(session.owner_id(), Some("U1"));
        assert!(session.apply(SessionEvent::Restore(None)).is_err());
    }
}

//! # Scan Capture
//!
//! Pure state machine behind the scanner screen.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Scan Capture                                   │
//! │                                                                         │
//! │   ┌──────┐ request(Undetermined) ┌───────────────────┐                  │
//! │   │ Idle │──────────────────────►│ PermissionPending │                  │
//! │   └──┬───┘                       └──┬─────────────┬──┘                  │
//! │      │ request(Granted)     granted │             │ denied              │
//! │      ▼                              ▼             ▼                     │
//! │   ┌──────────┐◄─────────────────────┘   ┌──────────────────┐            │
//! │   │ Scanning │── cancel ──► Idle        │ PermissionDenied │ (terminal) │
//! │   └──┬───────┘◄──────────┐              └──────────────────┘            │
//! │      │ QR decoded        │ scan again                                   │
//! │      ▼                   │                                              │
//! │   ┌──────────────────┐───┘                                              │
//! │   │ Decoded(payload) │── save ──► Save effect, stays Decoded            │
//! │   └──────┬───────────┘── open ──► SaveThenOpen effect, stays Decoded    │
//! │          │ dismiss                                                      │
//! │          ▼                                                              │
//! │        Idle                                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The machine never performs I/O. Each transition returns a [`ScanEffect`]
//! describing what the caller should do next (ask for permission, start the
//! decoder, save a record).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{DecodedCode, PermissionStatus};

// =============================================================================
// State, Actions, Effects
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "state", content = "payload", rename_all = "snake_case")]
pub enum ScanState {
    #[default]
    Idle,
    PermissionPending,
    Scanning,
    Decoded(String),
    /// Camera access refused. Leaving the screen is the only way out.
    PermissionDenied,
}

impl ScanState {
    fn label(&self) -> &'static str {
        match self {
            ScanState::Idle => "idle",
            ScanState::PermissionPending => "waiting for permission",
            ScanState::Scanning => "scanning",
            ScanState::Decoded(_) => "showing a decoded code",
            ScanState::PermissionDenied => "camera permission denied",
        }
    }
}

/// Choices offered while a decoded code is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ScanAction {
    ScanAgain,
    Save,
    Open,
}

impl ScanAction {
    fn label(&self) -> &'static str {
        match self {
            ScanAction::ScanAgain => "scan again",
            ScanAction::Save => "save",
            ScanAction::Open => "open",
        }
    }
}

/// Work the caller must carry out after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEffect {
    None,
    RequestPermission,
    StartDecoder,
    Save { payload: String },
    /// Save, then hand the payload to the URL opener whatever the save outcome.
    SaveThenOpen { payload: String },
}

// =============================================================================
// Machine
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ScanCapture {
    state: ScanState,
}

impl ScanCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Whether decoder output should currently be consumed.
    pub fn is_scanning(&self) -> bool {
        self.state == ScanState::Scanning
    }

    /// The user pressed "Scan now".
    ///
    /// Ignored while a scan is already in progress or a code is displayed.
    pub fn request_scan(&mut self, permission: PermissionStatus) -> ScanEffect {
        match self.state {
            ScanState::Idle | ScanState::PermissionPending => {}
            _ => return ScanEffect::None,
        }

        match permission {
            PermissionStatus::Undetermined => {
                self.state = ScanState::PermissionPending;
                ScanEffect::RequestPermission
            }
            PermissionStatus::Granted => {
                self.state = ScanState::Scanning;
                ScanEffect::StartDecoder
            }
            PermissionStatus::Denied => {
                self.state = ScanState::PermissionDenied;
                ScanEffect::None
            }
        }
    }

    /// The platform answered a permission prompt.
    pub fn permission_resolved(&mut self, granted: bool) -> ScanEffect {
        if self.state != ScanState::PermissionPending {
            return ScanEffect::None;
        }
        if granted {
            self.state = ScanState::Scanning;
            ScanEffect::StartDecoder
        } else {
            self.state = ScanState::PermissionDenied;
            ScanEffect::None
        }
    }

    /// Feeds one decoder result. Returns `true` if it was accepted.
    ///
    /// Anything arriving outside `Scanning` is dropped, which suppresses the
    /// burst of duplicate decodes a camera produces while a code stays in view.
    pub fn on_decoded(&mut self, code: &DecodedCode) -> bool {
        if !self.is_scanning() || !code.is_qr() {
            return false;
        }
        self.state = ScanState::Decoded(code.payload.clone());
        true
    }

    /// Applies a choice made while a code is displayed.
    ///
    /// # Errors
    /// [`CoreError::InvalidTransition`] unless the state is `Decoded`.
    pub fn choose(&mut self, action: ScanAction) -> CoreResult<ScanEffect> {
        let ScanState::Decoded(payload) = &self.state else {
            return Err(CoreError::invalid_transition(
                self.state.label(),
                action.label(),
            ));
        };

        let effect = match action {
            ScanAction::ScanAgain => {
                self.state = ScanState::Scanning;
                ScanEffect::StartDecoder
            }
            ScanAction::Save => ScanEffect::Save {
                payload: payload.clone(),
            },
            ScanAction::Open => ScanEffect::SaveThenOpen {
                payload: payload.clone(),
            },
        };
        Ok(effect)
    }

    /// Stops an in-progress scan without a code.
    ///
    /// Returns `true` if the machine was scanning.
    pub fn cancel(&mut self) -> bool {
        if !self.is_scanning() {
            return false;
        }
        self.state = ScanState::Idle;
        true
    }

    /// Closes the decoded prompt.
    pub fn dismiss(&mut self) {
        if matches!(self.state, ScanState::Decoded(_)) {
            self.state = ScanState::Idle;
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

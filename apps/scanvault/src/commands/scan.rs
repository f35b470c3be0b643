//! # Scan Commands
//!
//! Drives [`ScanCapture`] and carries out its effects.
//!
//! ## Scanner Screen Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  "Scan now" ──► scan_now() ──► CameraPermission                         │
//! │                                  │ Granted   ──► Scanning               │
//! │                                  │ Undecided ──► request() ──┐          │
//! │                                  │ Denied    ──► "No access to camera"  │
//! │                                                              ▼          │
//! │  Scanning ──► next_event() ──► QR? ──► Decoded(payload)                 │
//! │                            └─► cancelled ──► Idle                       │
//! │                                                                         │
//! │  Decoded:  "Scan again" ──► Scanning                                    │
//! │            "Save"       ──► RecordStore::save(uid, payload) ──► alert   │
//! │            "Open"       ──► save, then UrlOpener::open(payload)         │
//! │                             (opens even when the save failed)           │
//! │            dismiss      ──► Idle                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use scanvault_core::scan::{ScanAction, ScanCapture, ScanEffect, ScanState};
use scanvault_core::session::Session;
use scanvault_core::{DecodedCode, PermissionError};
use scanvault_db::RecordStore;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::platform::{BarcodeDecoder, CameraPermission, DecoderEvent, UrlOpener};

pub const SAVED_ALERT: &str = "Data saved to store";
pub const SAVE_FAILED_ALERT: &str = "Error adding document";

/// How a capture ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    Decoded(String),
    Cancelled,
}

/// A blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: &'static str,
    pub detail: Option<String>,
}

/// What a save or open choice did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    /// Record id, or the save error
    pub saved: Result<String, ApiError>,
    /// Whether the payload was handed to the URL opener
    pub opened: bool,
}

impl ActionReport {
    pub fn alert(&self) -> Alert {
        match &self.saved {
            Ok(_) => Alert {
                title: SAVED_ALERT,
                detail: None,
            },
            Err(e) => Alert {
                title: SAVE_FAILED_ALERT,
                detail: Some(e.message.clone()),
            },
        }
    }
}

pub struct ScanController {
    capture: ScanCapture,
    permission: Arc<dyn CameraPermission>,
    records: Arc<dyn RecordStore>,
    opener: Arc<dyn UrlOpener>,
}

impl ScanController {
    pub fn new(
        permission: Arc<dyn CameraPermission>,
        records: Arc<dyn RecordStore>,
        opener: Arc<dyn UrlOpener>,
    ) -> Self {
        ScanController {
            capture: ScanCapture::new(),
            permission,
            records,
            opener,
        }
    }

    pub fn state(&self) -> &ScanState {
        self.capture.state()
    }

    /// "Scan now": resolves the camera permission and starts scanning.
    ///
    /// # Errors
    /// `PERMISSION_DENIED` when camera access is refused. The controller then
    /// stays in `PermissionDenied` until it is dropped.
    pub async fn scan_now(&mut self) -> Result<(), ApiError> {
        let mut effect = self.capture.request_scan(self.permission.status());
        if effect == ScanEffect::RequestPermission {
            let granted = self.permission.request().await;
            effect = self.capture.permission_resolved(granted);
        }

        match self.capture.state() {
            ScanState::PermissionDenied => {
                warn!("Camera permission denied");
                Err(PermissionError::CameraDenied.into())
            }
            _ => {
                if effect == ScanEffect::StartDecoder {
                    debug!("Decoder started");
                }
                Ok(())
            }
        }
    }

    /// Feeds one decoder result. Returns `true` if it was accepted.
    pub fn on_decoded(&mut self, code: &DecodedCode) -> bool {
        let accepted = self.capture.on_decoded(code);
        if !accepted {
            debug!(symbology = ?code.symbology, state = ?self.capture.state(), "Decode ignored");
        }
        accepted
    }

    /// Pulls events from `decoder` until a code is accepted or the user
    /// cancels.
    ///
    /// `None` if not scanning or the decoder ran dry.
    pub async fn capture_from(&mut self, decoder: &dyn BarcodeDecoder) -> Option<Capture> {
        while self.capture.is_scanning() {
            match decoder.next_event().await? {
                DecoderEvent::Code(code) => {
                    if self.on_decoded(&code) {
                        info!(len = code.payload.len(), "Code decoded");
                        return Some(Capture::Decoded(code.payload));
                    }
                }
                DecoderEvent::Cancelled => {
                    self.cancel();
                    return Some(Capture::Cancelled);
                }
            }
        }
        None
    }

    /// Stops scanning and returns to the idle scanner screen.
    pub fn cancel(&mut self) {
        if self.capture.cancel() {
            debug!("Scan cancelled");
        }
    }

    /// Applies a choice for the displayed code.
    ///
    /// "Scan again" yields `Ok(None)`. "Save" and "Open" need a signed-in
    /// session. Without one they fail with `NOT_SIGNED_IN` and nothing is
    /// written.
    pub async fn choose(
        &mut self,
        action: ScanAction,
        session: &Session,
    ) -> Result<Option<ActionReport>, ApiError> {
        if action != ScanAction::ScanAgain && session.owner_id().is_none() {
            return Err(ApiError::not_signed_in());
        }

        match self.capture.choose(action)? {
            ScanEffect::Save { payload } => {
                let saved = self.save(session, &payload).await;
                Ok(Some(ActionReport {
                    saved,
                    opened: false,
                }))
            }
            ScanEffect::SaveThenOpen { payload } => {
                let saved = self.save(session, &payload).await;
                let opened = match self.opener.open(&payload).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "Could not open payload");
                        false
                    }
                };
                Ok(Some(ActionReport { saved, opened }))
            }
            _ => Ok(None),
        }
    }

    /// Closes the decoded prompt.
    pub fn dismiss(&mut self) {
        self.capture.dismiss();
    }

    async fn save(&self, session: &Session, payload: &str) -> Result<String, ApiError> {
        let owner_id = session.owner_id().ok_or_else(ApiError::not_signed_in)?;
        match self.records.save(owner_id, payload).await {
            Ok(id) => {
                info!(id = %id, backend = self.records.backend(), "Scan saved");
                Ok(id)
            }
            Err(e) => {
                warn!(error = %e, "Scan save failed");
                Err(e.into())
            }
        }
    }
}

impl std::fmt::Debug for ScanController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanController")
            .field("state", self.capture.state())
            .field("backend", &self.records.backend())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::platform::StaticPermission;
    use crate::testing::{MemoryRecordStore, RecordingOpener, ScriptedDecoder};
    use scanvault_core::session::SessionEvent;
    use scanvault_core::{PermissionStatus, Symbology, UserRef};

    struct Harness {
        controller: ScanController,
        records: Arc<MemoryRecordStore>,
        opener: Arc<RecordingOpener>,
    }

    fn harness(permission: StaticPermission, records: MemoryRecordStore) -> Harness {
        let records = Arc::new(records);
        let opener = Arc::new(RecordingOpener::default());
        Harness {
            controller: ScanController::new(Arc::new(permission), records.clone(), opener.clone()),
            records,
            opener,
        }
    }

    fn signed_in() -> Session {
        let mut session = Session::new();
        session
            .apply(SessionEvent::Restore(Some(UserRef::new("U1"))))
            .unwrap();
        session
    }

    async fn decoded(h: &mut Harness, payload: &str) {
        h.controller.scan_now().await.unwrap();
        let decoder = ScriptedDecoder::new([DecodedCode::qr(payload)]);
        assert_eq!(
            h.controller.capture_from(&decoder).await,
            Some(Capture::Decoded(payload.to_string()))
        );
    }

    #[tokio::test]
    async fn test_open_saves_then_opens() {
        let mut h = harness(StaticPermission::granted(), MemoryRecordStore::default());
        decoded(&mut h, "https://example.com").await;

        let report = h
            .controller
            .choose(ScanAction::Open, &signed_in())
            .await
            .unwrap()
            .unwrap();

        assert!(report.saved.is_ok());
        assert!(report.opened);
        assert_eq!(report.alert().title, SAVED_ALERT);
        assert_eq!(h.opener.opened(), vec!["https://example.com".to_string()]);

        let records = h.records.list_by_owner("U1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload, "https://example.com");
    }

    #[tokio::test]
    async fn test_open_after_failed_save_still_opens() {
        let mut h = harness(StaticPermission::granted(), MemoryRecordStore::failing());
        decoded(&mut h, "https://example.com").await;

        let report = h
            .controller
            .choose(ScanAction::Open, &signed_in())
            .await
            .unwrap()
            .unwrap();

        assert!(report.opened);
        let alert = report.alert();
        assert_eq!(alert.title, SAVE_FAILED_ALERT);
        assert!(alert.detail.unwrap().contains("disk full"));
    }

    #[tokio::test]
    async fn test_save_twice_creates_two_records() {
        let mut h = harness(StaticPermission::granted(), MemoryRecordStore::default());
        decoded(&mut h, "hello").await;

        let session = signed_in();
        for _ in 0..2 {
            let report = h
                .controller
                .choose(ScanAction::Save, &session)
                .await
                .unwrap()
                .unwrap();
            assert!(!report.opened);
        }
        assert_eq!(h.records.len(), 2);
        assert_eq!(h.controller.state(), &ScanState::Decoded("hello".into()));
    }

    #[tokio::test]
    async fn test_save_without_session_writes_nothing() {
        let mut h = harness(StaticPermission::granted(), MemoryRecordStore::default());
        decoded(&mut h, "hello").await;

        let err = h
            .controller
            .choose(ScanAction::Save, &Session::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotSignedIn);
        assert_eq!(h.records.len(), 0);
        assert!(h.opener.opened().is_empty());
    }

    #[tokio::test]
    async fn test_non_qr_codes_are_skipped() {
        let mut h = harness(StaticPermission::granted(), MemoryRecordStore::default());
        h.controller.scan_now().await.unwrap();

        let decoder = ScriptedDecoder::new([
            DecodedCode {
                payload: "4006381333931".into(),
                symbology: Symbology::Ean13,
            },
            DecodedCode::qr("second"),
        ]);
        assert_eq!(
            h.controller.capture_from(&decoder).await,
            Some(Capture::Decoded("second".to_string()))
        );
    }

    #[tokio::test]
    async fn test_decodes_while_displayed_are_ignored() {
        let mut h = harness(StaticPermission::granted(), MemoryRecordStore::default());
        decoded(&mut h, "first").await;

        assert!(!h.controller.on_decoded(&DecodedCode::qr("second")));
        assert_eq!(h.controller.state(), &ScanState::Decoded("first".into()));

        let decoder = ScriptedDecoder::new([DecodedCode::qr("third")]);
        assert_eq!(h.controller.capture_from(&decoder).await, None);
    }

    #[tokio::test]
    async fn test_scan_again_and_dismiss() {
        let mut h = harness(StaticPermission::granted(), MemoryRecordStore::default());
        decoded(&mut h, "first").await;

        let report = h
            .controller
            .choose(ScanAction::ScanAgain, &Session::new())
            .await
            .unwrap();
        assert!(report.is_none());
        assert_eq!(h.controller.state(), &ScanState::Scanning);

        let decoder = ScriptedDecoder::new([DecodedCode::qr("second")]);
        h.controller.capture_from(&decoder).await;
        h.controller.dismiss();
        assert_eq!(h.controller.state(), &ScanState::Idle);
    }

    #[tokio::test]
    async fn test_cancel_returns_to_idle_without_saving() {
        let mut h = harness(StaticPermission::granted(), MemoryRecordStore::default());
        h.controller.scan_now().await.unwrap();

        let decoder = ScriptedDecoder::events([
            DecoderEvent::Cancelled,
            DecoderEvent::Code(DecodedCode::qr("after")),
        ]);
        assert_eq!(
            h.controller.capture_from(&decoder).await,
            Some(Capture::Cancelled)
        );
        assert_eq!(h.controller.state(), &ScanState::Idle);
        assert_eq!(h.controller.capture_from(&decoder).await, None);
        assert_eq!(h.records.len(), 0);

        h.controller.scan_now().await.unwrap();
        assert_eq!(
            h.controller.capture_from(&decoder).await,
            Some(Capture::Decoded("after".to_string()))
        );
    }

    #[tokio::test]
    async fn test_permission_prompt_granted() {
        let mut h = harness(
            StaticPermission::new(PermissionStatus::Undetermined, true),
            MemoryRecordStore::default(),
        );
        h.controller.scan_now().await.unwrap();
        assert_eq!(h.controller.state(), &ScanState::Scanning);
    }

    #[tokio::test]
    async fn test_permission_denied_is_terminal() {
        let mut h = harness(
            StaticPermission::new(PermissionStatus::Undetermined, false),
            MemoryRecordStore::default(),
        );
        let err = h.controller.scan_now().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert_eq!(err.message, "No access to camera");

        assert!(h.controller.scan_now().await.is_err());
        assert_eq!(h.controller.state(), &ScanState::PermissionDenied);
    }

    #[tokio::test]
    async fn test_choose_without_code_is_rejected() {
        let mut h = harness(StaticPermission::granted(), MemoryRecordStore::default());
        let err = h
            .controller
            .choose(ScanAction::Save, &signed_in())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }
}

//! # Platform Services
//!
//! Camera permission, barcode decoding and URL opening are owned by the
//! platform. The scanner only sees these traits.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ScanController                                                        │
//! │      │ status()/request()      │ next_event()         │ open(url)       │
//! │      ▼                         ▼                      ▼                 │
//! │   CameraPermission         BarcodeDecoder          UrlOpener            │
//! │      │                         │                      │                 │
//! │   StaticPermission         LineDecoder             SystemUrlOpener      │
//! │   (configured)             (keyboard wedge,        (xdg-open / open /   │
//! │                             one code per line)      url.dll handler)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use scanvault_core::{DecodedCode, PermissionStatus, Symbology};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

// =============================================================================
// Contracts
// =============================================================================

#[async_trait]
pub trait CameraPermission: Send + Sync {
    /// Current status without prompting.
    fn status(&self) -> PermissionStatus;

    /// Prompts the user. Returns whether access was granted.
    async fn request(&self) -> bool;
}

/// What a decoder produced while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEvent {
    Code(DecodedCode),
    /// The user stopped the scan without a code.
    Cancelled,
}

#[async_trait]
pub trait BarcodeDecoder: Send + Sync {
    /// Waits for the next event. `None` when the source is exhausted.
    async fn next_event(&self) -> Option<DecoderEvent>;
}

#[async_trait]
pub trait UrlOpener: Send + Sync {
    async fn open(&self, target: &str) -> std::io::Result<()>;
}

// =============================================================================
// Camera Permission
// =============================================================================

/// Permission answer fixed by configuration.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission {
    status: PermissionStatus,
    grant_on_request: bool,
}

impl StaticPermission {
    pub fn new(status: PermissionStatus, grant_on_request: bool) -> Self {
        StaticPermission {
            status,
            grant_on_request,
        }
    }

    pub fn granted() -> Self {
        Self::new(PermissionStatus::Granted, true)
    }
}

#[async_trait]
impl CameraPermission for StaticPermission {
    fn status(&self) -> PermissionStatus {
        self.status
    }

    async fn request(&self) -> bool {
        info!(granted = self.grant_on_request, "Camera permission requested");
        self.grant_on_request
    }
}

// =============================================================================
// Console Input
// =============================================================================

type BoxedReader = Box<dyn AsyncBufRead + Send + Unpin>;

/// Line source shared by the shell prompts and the wedge decoder.
pub struct ConsoleInput {
    lines: Mutex<Lines<BoxedReader>>,
}

impl ConsoleInput {
    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }

    pub fn from_reader(reader: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        let reader: BoxedReader = Box::new(reader);
        ConsoleInput {
            lines: Mutex::new(reader.lines()),
        }
    }

    /// Next line with the line ending stripped. `None` at end of input.
    pub async fn read_line(&self) -> Option<String> {
        match self.lines.lock().await.next_line().await {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to read input");
                None
            }
        }
    }
}

impl std::fmt::Debug for ConsoleInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleInput").finish_non_exhaustive()
    }
}

// =============================================================================
// Keyboard-Wedge Decoder
// =============================================================================

/// Decoder for scanners that type each code followed by Enter.
///
/// Lines may start with an AIM symbology identifier (`]Q1`, `]E0`, ...).
/// Lines without one are taken as QR codes. A blank line (Enter on its own)
/// cancels the scan, since no code decodes to an empty payload.
#[derive(Debug, Clone)]
pub struct LineDecoder {
    input: Arc<ConsoleInput>,
}

impl LineDecoder {
    pub fn new(input: Arc<ConsoleInput>) -> Self {
        LineDecoder { input }
    }
}

#[async_trait]
impl BarcodeDecoder for LineDecoder {
    async fn next_event(&self) -> Option<DecoderEvent> {
        let line = self.input.read_line().await?;
        match parse_wedge_line(&line) {
            Some(code) => {
                debug!(symbology = ?code.symbology, "Decoded line");
                Some(DecoderEvent::Code(code))
            }
            None => {
                debug!("Blank line, scan cancelled");
                Some(DecoderEvent::Cancelled)
            }
        }
    }
}

/// Parses one scanner line, honouring an AIM identifier prefix.
///
/// `None` for a blank line.
pub fn parse_wedge_line(line: &str) -> Option<DecodedCode> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let (symbology, payload) = match line.strip_prefix(']') {
        Some(rest) if rest.len() >= 2 && rest.is_char_boundary(2) => {
            let (id, payload) = rest.split_at(2);
            (aim_symbology(id), payload)
        }
        _ => (Symbology::Qr, line),
    };

    Some(DecodedCode {
        payload: payload.to_string(),
        symbology,
    })
}

fn aim_symbology(id: &str) -> Symbology {
    match id.as_bytes() {
        [b'Q', _] => Symbology::Qr,
        [b'E', b'4'] => Symbology::Ean8,
        [b'E', _] => Symbology::Ean13,
        [b'C', _] => Symbology::Code128,
        [b'd', _] => Symbology::DataMatrix,
        _ => Symbology::Other,
    }
}

// =============================================================================
// URL Opener
// =============================================================================

/// Hands the target to the desktop's default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemUrlOpener;

#[async_trait]
impl UrlOpener for SystemUrlOpener {
    async fn open(&self, target: &str) -> std::io::Result<()> {
        let mut command = opener_command(target)?;
        let status = command.status().await?;
        if status.success() {
            info!(target, "Opened payload");
            Ok(())
        } else {
            Err(std::io::Error::other(format!(
                "opener exited with {status}"
            )))
        }
    }
}

/// Builds the opener invocation. The target is always a single argv entry
/// and never passes through a shell.
///
/// Targets starting with `-` are refused: every opener would read them as
/// its own flags.
fn opener_command(target: &str) -> std::io::Result<tokio::process::Command> {
    if target.starts_with('-') {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "refusing to open a target that starts with '-'",
        ));
    }
    let (program, leading) = opener_program();
    let mut command = tokio::process::Command::new(program);
    command.args(leading).arg(target);
    Ok(command)
}

#[cfg(target_os = "macos")]
fn opener_program() -> (&'static str, &'static [&'static str]) {
    ("open", &[])
}

// `cmd /C start` would re-parse `&`, `|` and `^` in the payload.
#[cfg(target_os = "windows")]
fn opener_program() -> (&'static str, &'static [&'static str]) {
    ("rundll32", &["url.dll,FileProtocolHandler"])
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener_program() -> (&'static str, &'static [&'static str]) {
    ("xdg-open", &[])
}

//! # Terminal Shell
//!
//! Text front-end. Renders the routed screen, reads one action per line and
//! hands it to the screen's controller.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   loop:                                                                 │
//! │     Navigator::sync(session snapshot)                                   │
//! │        │ root changed → fresh AuthScreen / ScanController / StorageView │
//! │        ▼                                                                │
//! │     Splash  ── wait for restore ─────────────────────────┐              │
//! │     Auth    ── l) submit  t) toggle mode                 │              │
//! │     Scanner ── s) scan  v) saved codes  l) logout        ├─► repeat     │
//! │     Storage ── <n>) open  b) back                        │              │
//! │                                                          │              │
//! │     q / end of input ──► quit                            ┘              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::io::Write;

use scanvault_core::navigation::{Navigator, Screen};
use scanvault_core::scan::{ScanAction, ScanState};
use scanvault_core::validation::{AuthMode, FIELD_CONFIRM_PASSWORD, FIELD_EMAIL, FIELD_PASSWORD};
use tracing::debug;

use crate::commands::scan::Alert;
use crate::commands::storage::{saved_label, EMPTY_MESSAGE};
use crate::commands::{AuthScreen, ListState, ScanController, StorageView};
use crate::Services;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Shell<'a, W: Write> {
    services: &'a Services,
    out: W,
    navigator: Navigator,
    auth: AuthScreen,
    scanner: Option<ScanController>,
    storage: StorageView,
}

impl<'a, W: Write> Shell<'a, W> {
    pub fn new(services: &'a Services, out: W) -> Self {
        Shell {
            services,
            out,
            navigator: Navigator::new(),
            auth: AuthScreen::new(),
            scanner: None,
            storage: StorageView::new(),
        }
    }

    /// Runs until the user quits or input ends.
    pub async fn run(&mut self) -> std::io::Result<()> {
        loop {
            let session = self.services.session.snapshot();
            if self.navigator.sync(&session) {
                debug!(screen = ?self.navigator.root(), "Root screen changed");
                self.auth = AuthScreen::new();
                self.scanner = None;
                self.storage.unmount();
            }

            let flow = match self.navigator.current() {
                Screen::Splash => self.splash().await?,
                Screen::Auth => self.auth_screen().await?,
                Screen::Scanner => self.scanner_screen().await?,
                Screen::Storage => self.storage_screen().await?,
            };
            if flow == Flow::Quit {
                writeln!(self.out, "Bye.")?;
                return Ok(());
            }
        }
    }

    // =========================================================================
    // Screens
    // =========================================================================

    async fn splash(&mut self) -> std::io::Result<Flow> {
        writeln!(self.out, "ScanVault")?;
        writeln!(self.out, "Loading...")?;
        self.out.flush()?;
        self.services.session.resolved().await;
        Ok(Flow::Continue)
    }

    async fn auth_screen(&mut self) -> std::io::Result<Flow> {
        let (title, other) = match self.auth.mode() {
            AuthMode::Login => ("Login", "sign up"),
            AuthMode::SignUp => ("Sign up", "login"),
        };
        self.heading(title)?;
        writeln!(self.out, "  l) {title}  t) Switch to {other}  q) Quit")?;

        let Some(choice) = self.prompt("> ").await? else {
            return Ok(Flow::Quit);
        };
        match choice.as_str() {
            "q" => return Ok(Flow::Quit),
            "t" => {
                self.auth.toggle_mode();
                return Ok(Flow::Continue);
            }
            "l" => {}
            _ => return Ok(Flow::Continue),
        }

        let sign_up = self.auth.mode() == AuthMode::SignUp;
        let Some(email) = self.prompt("Email: ").await? else {
            return Ok(Flow::Quit);
        };
        let Some(password) = self.prompt("Password: ").await? else {
            return Ok(Flow::Quit);
        };
        let confirm = if sign_up {
            match self.prompt("Confirm password: ").await? {
                Some(confirm) => confirm,
                None => return Ok(Flow::Quit),
            }
        } else {
            String::new()
        };

        let form = self.auth.form_mut();
        form.email = email;
        form.password = password;
        form.confirm_password = confirm;

        if let Err(e) = self.auth.submit(&self.services.session).await {
            let errors = self.auth.errors();
            if errors.is_empty() {
                writeln!(self.out, "! {}", e.message)?;
            } else {
                for field in [FIELD_EMAIL, FIELD_PASSWORD, FIELD_CONFIRM_PASSWORD] {
                    if let Some(message) = errors.message_for(field) {
                        writeln!(self.out, "  {field}: {message}")?;
                    }
                }
            }
        }
        Ok(Flow::Continue)
    }

    async fn scanner_screen(&mut self) -> std::io::Result<Flow> {
        let services = self.services;
        let scanner = self.scanner.get_or_insert_with(|| {
            ScanController::new(
                services.permission.clone(),
                services.records.store(),
                services.opener.clone(),
            )
        });

        match scanner.state().clone() {
            ScanState::Scanning => {
                writeln!(self.out, "Scan a QR code... (empty line to stop)")?;
                self.out.flush()?;
                let scanner = self.scanner.as_mut();
                let capture = match scanner {
                    Some(scanner) => scanner.capture_from(services.decoder.as_ref()).await,
                    None => None,
                };
                Ok(match capture {
                    Some(_) => Flow::Continue,
                    None => Flow::Quit,
                })
            }
            ScanState::Decoded(payload) => self.decoded_prompt(&payload).await,
            state => {
                self.heading(Screen::Scanner.title())?;
                let session = services.session.snapshot();
                if let Some(user) = session.user() {
                    let who = user.email.as_deref().unwrap_or(&user.uid);
                    writeln!(self.out, "Signed in as {who}")?;
                }
                let denied = state == ScanState::PermissionDenied;
                if denied {
                    writeln!(self.out, "No access to camera")?;
                    writeln!(self.out, "  v) Saved codes  l) Logout  q) Quit")?;
                } else {
                    writeln!(self.out, "  s) Scan now  v) Saved codes  l) Logout  q) Quit")?;
                }

                let Some(choice) = self.prompt("> ").await? else {
                    return Ok(Flow::Quit);
                };
                match choice.as_str() {
                    "q" => Ok(Flow::Quit),
                    "s" if !denied => {
                        if let Some(scanner) = self.scanner.as_mut() {
                            if let Err(e) = scanner.scan_now().await {
                                writeln!(self.out, "! {}", e.message)?;
                            }
                        }
                        Ok(Flow::Continue)
                    }
                    "v" => {
                        if self.navigator.push_storage() {
                            let records = services.records.store();
                            self.storage.mount_and_load(records.as_ref(), &session).await;
                        }
                        Ok(Flow::Continue)
                    }
                    "l" => {
                        if self.confirm("Log out?").await? == Some(true) {
                            services.session.sign_out().await;
                        }
                        Ok(Flow::Continue)
                    }
                    _ => Ok(Flow::Continue),
                }
            }
        }
    }

    async fn decoded_prompt(&mut self, payload: &str) -> std::io::Result<Flow> {
        writeln!(self.out, "Scanned: {payload}")?;
        writeln!(self.out, "  a) Scan again  s) Save  o) Open  d) Dismiss")?;

        let Some(choice) = self.prompt("> ").await? else {
            return Ok(Flow::Quit);
        };
        let action = match choice.as_str() {
            "a" => ScanAction::ScanAgain,
            "s" => ScanAction::Save,
            "o" => ScanAction::Open,
            "d" => {
                if let Some(scanner) = self.scanner.as_mut() {
                    scanner.dismiss();
                }
                return Ok(Flow::Continue);
            }
            "q" => return Ok(Flow::Quit),
            _ => return Ok(Flow::Continue),
        };

        let session = self.services.session.snapshot();
        let Some(scanner) = self.scanner.as_mut() else {
            return Ok(Flow::Continue);
        };
        match scanner.choose(action, &session).await {
            Ok(Some(report)) => self.alert(&report.alert())?,
            Ok(None) => {}
            Err(e) => writeln!(self.out, "! {}", e.message)?,
        }
        Ok(Flow::Continue)
    }

    async fn storage_screen(&mut self) -> std::io::Result<Flow> {
        self.heading(Screen::Storage.title())?;
        match self.storage.list() {
            ListState::Loading => writeln!(self.out, "Loading...")?,
            ListState::Failed(e) => writeln!(self.out, "! {}", e.message)?,
            ListState::Ready(records) if records.is_empty() => {
                writeln!(self.out, "{EMPTY_MESSAGE}")?
            }
            ListState::Ready(records) => {
                for (i, record) in records.iter().enumerate() {
                    writeln!(self.out, "{:>3}) {}", i + 1, record.payload)?;
                    writeln!(self.out, "     {}", saved_label(record.saved_at))?;
                }
            }
        }
        writeln!(self.out, "  <n>) Open  b) Back  q) Quit")?;

        let Some(choice) = self.prompt("> ").await? else {
            return Ok(Flow::Quit);
        };
        match choice.as_str() {
            "q" => return Ok(Flow::Quit),
            "b" => {
                self.storage.unmount();
                self.navigator.back();
                return Ok(Flow::Continue);
            }
            _ => {}
        }

        let Some(record) = choice
            .parse::<usize>()
            .ok()
            .and_then(|n| self.storage.select(n))
            .cloned()
        else {
            return Ok(Flow::Continue);
        };
        if self.confirm(&format!("Open {}?", record.payload)).await? == Some(true) {
            if let Err(e) = self.storage.open(&record, &self.services.opener).await {
                writeln!(self.out, "! {}", e.message)?;
            }
        }
        Ok(Flow::Continue)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn heading(&mut self, title: &str) -> std::io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "== {title} ==")
    }

    fn alert(&mut self, alert: &Alert) -> std::io::Result<()> {
        match &alert.detail {
            Some(detail) => writeln!(self.out, "! {}: {detail}", alert.title),
            None => writeln!(self.out, "! {}", alert.title),
        }
    }

    /// Prints `label` and reads a trimmed line. `None` at end of input.
    async fn prompt(&mut self, label: &str) -> std::io::Result<Option<String>> {
        write!(self.out, "{label}")?;
        self.out.flush()?;
        Ok(self
            .services
            .input
            .read_line()
            .await
            .map(|line| line.trim().to_string()))
    }

    /// Yes/no question. `None` at end of input.
    async fn confirm(&mut self, question: &str) -> std::io::Result<Option<bool>> {
        let answer = self.prompt(&format!("{question} (y/n) ")).await?;
        Ok(answer.map(|a| a.eq_ignore_ascii_case("y") || a.eq_ignore_ascii_case("yes")))
    }
}

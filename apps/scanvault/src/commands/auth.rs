//! # Auth Commands
//!
//! Login / sign-up screen controller.
//!
//! ```text
//!   submit()
//!     │
//!     ├─ submitting? ───────────────────────► Err(BUSINESS_LOGIC)
//!     │
//!     ├─ form.validate() ── errors ─────────► field errors kept,
//!     │                                       Err(VALIDATION_ERROR)
//!     │
//!     └─ SessionStore::sign_in / sign_up
//!             ├─ Ok(user) ──────────────────► Ok(user), form cleared
//!             └─ Err(AuthError) ────────────► alert:
//!                   Login   "Invalid email or password"
//!                   SignUp  "Something went wrong"
//! ```

use scanvault_core::validation::{AuthForm, AuthMode, FormErrors};
use scanvault_core::{Credentials, UserRef};
use tracing::{info, warn};

use crate::error::{ApiError, ErrorCode};
use crate::state::SessionStore;

pub const LOGIN_FAILED_ALERT: &str = "Invalid email or password";
pub const SIGN_UP_FAILED_ALERT: &str = "Something went wrong";

#[derive(Debug, Default)]
pub struct AuthScreen {
    form: AuthForm,
    errors: FormErrors,
    submitting: bool,
}

impl AuthScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> AuthMode {
        self.form.mode
    }

    pub fn form_mut(&mut self) -> &mut AuthForm {
        &mut self.form
    }

    /// Field errors from the last submit.
    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    /// Whether the submit button is disabled.
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Switches between login and sign-up, clearing fields and errors.
    pub fn toggle_mode(&mut self) {
        self.form.toggle_mode();
        self.errors = FormErrors::default();
    }

    /// Validates the form and marks the screen as submitting.
    pub fn begin_submit(&mut self) -> Result<Credentials, ApiError> {
        if self.submitting {
            return Err(ApiError::new(
                ErrorCode::BusinessLogic,
                "A request is already in flight",
            ));
        }

        match self.form.validate() {
            Ok(credentials) => {
                self.errors = FormErrors::default();
                self.submitting = true;
                Ok(credentials)
            }
            Err(errors) => {
                self.errors = errors.clone();
                Err(errors.into())
            }
        }
    }

    /// Records the provider's answer and produces the alert for a failure.
    pub fn finish_submit(
        &mut self,
        result: Result<UserRef, scanvault_core::AuthError>,
    ) -> Result<UserRef, ApiError> {
        self.submitting = false;
        match result {
            Ok(user) => {
                self.form = AuthForm::new(self.form.mode);
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, mode = ?self.form.mode, "Authentication failed");
                let code = ApiError::from(e).code;
                let alert = match self.form.mode {
                    AuthMode::Login => LOGIN_FAILED_ALERT,
                    AuthMode::SignUp => SIGN_UP_FAILED_ALERT,
                };
                Err(ApiError::new(code, alert))
            }
        }
    }

    /// Validates, then signs in or registers through the session store.
    pub async fn submit(&mut self, session: &SessionStore) -> Result<UserRef, ApiError> {
        let credentials = self.begin_submit()?;
        let result = match self.form.mode {
            AuthMode::Login => session.sign_in(&credentials).await,
            AuthMode::SignUp => session.sign_up(&credentials).await,
        };
        let user = self.finish_submit(result)?;
        info!(uid = %user.uid, "Authenticated");
        Ok(user)
    }
}

//! # Validation Module
//!
//! Auth form validation for ScanVault.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: AuthForm (THIS MODULE)                                       │
//! │  ├── Empty / format / length / confirmation checks                     │
//! │  └── Per-field messages, no network call on failure                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Identity provider                                            │
//! │  ├── Account existence, password match                                 │
//! │  └── Provider-side password policy                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use scanvault_core::validation::{AuthForm, AuthMode};
//!
//! let mut form = AuthForm::new(AuthMode::SignUp);
//! form.email = "ada@example.com".to_string();
//! form.password = "12345".to_string();
//! form.confirm_password = "12345".to_string();
//!
//! let errors = form.validate().unwrap_err();
//! assert_eq!(
//!     errors.message_for("password"),
//!     Some("Password must be at least 6 characters")
//! );
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::Credentials;
use crate::MIN_PASSWORD_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub const FIELD_EMAIL: &str = "email";
pub const FIELD_PASSWORD: &str = "password";
pub const FIELD_CONFIRM_PASSWORD: &str = "confirmPassword";

// =============================================================================
// Field Validators
// =============================================================================

/// Validates an email address.
///
/// ## Rules
/// - Must not be empty
/// - HTML `type=email` address syntax: a local part of letters, digits and
///   ``.!#$%&'*+/=?^_`{|}~-``, one `@`, then one or more dot-separated
///   labels of letters, digits and inner hyphens (at most 63 characters each)
///
/// The input is not trimmed. Surrounding whitespace makes it invalid.
///
/// ## Example
/// ```rust
/// use scanvault_core::validation::validate_email;
///
/// assert!(validate_email("ada@example.com").is_ok());
/// assert!(validate_email("ada@localhost").is_ok());
/// assert!(validate_email("").is_err());
/// assert!(validate_email("ada@").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    if email.is_empty() {
        return Err(ValidationError::Required {
            field: FIELD_EMAIL.to_string(),
            message: "Email can't be empty".to_string(),
        });
    }

    if !looks_like_email(email) {
        return Err(ValidationError::InvalidFormat {
            field: FIELD_EMAIL.to_string(),
            message: "Email must be valid".to_string(),
        });
    }

    Ok(())
}

const LOCAL_PUNCTUATION: &str = ".!#$%&'*+/=?^_`{|}~-";

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || LOCAL_PUNCTUATION.contains(c));

    local_ok && domain.split('.').all(is_domain_label)
}

fn is_domain_label(label: &str) -> bool {
    (1..=63).contains(&label.len())
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Validates a password.
///
/// ## Rules
/// - Must not be empty
/// - When `enforce_length` is set (sign-up), at least [`MIN_PASSWORD_LEN`]
///   characters
pub fn validate_password(password: &str, enforce_length: bool) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: FIELD_PASSWORD.to_string(),
            message: "Password can't be empty".to_string(),
        });
    }

    if enforce_length && password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: FIELD_PASSWORD.to_string(),
            min: MIN_PASSWORD_LEN,
            message: format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        });
    }

    Ok(())
}

/// Validates that the confirmation repeats the password.
pub fn validate_confirmation(password: &str, confirm: &str) -> ValidationResult<()> {
    if password != confirm {
        return Err(ValidationError::Mismatch {
            field: FIELD_CONFIRM_PASSWORD.to_string(),
            message: "Passwords don't match".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Auth Form
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    Login,
    SignUp,
}

/// Field-level errors from a failed [`AuthForm::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    errors: Vec<ValidationError>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// First error for `field`, if any.
    pub fn for_field(&self, field: &str) -> Option<&ValidationError> {
        self.errors.iter().find(|e| e.field() == field)
    }

    /// Message to show under `field`, if any.
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.for_field(field).map(|e| match e {
            ValidationError::Required { message, .. }
            | ValidationError::TooShort { message, .. }
            | ValidationError::InvalidFormat { message, .. }
            | ValidationError::Mismatch { message, .. } => message.as_str(),
        })
    }

    fn push(&mut self, result: ValidationResult<()>) {
        if let Err(e) = result {
            self.errors.push(e);
        }
    }
}

/// Contents of the login / sign-up form.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl std::fmt::Debug for AuthForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthForm")
            .field("mode", &self.mode)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl AuthForm {
    pub fn new(mode: AuthMode) -> Self {
        AuthForm {
            mode,
            ..Default::default()
        }
    }

    /// Switches between login and sign-up, clearing the form.
    pub fn toggle_mode(&mut self) {
        let mode = match self.mode {
            AuthMode::Login => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::Login,
        };
        *self = AuthForm::new(mode);
    }

    /// Runs every check for the current mode.
    ///
    /// All failing fields are reported at once.
    pub fn validate(&self) -> Result<Credentials, FormErrors> {
        let sign_up = self.mode == AuthMode::SignUp;
        let mut errors = FormErrors::default();

        errors.push(validate_email(&self.email));
        errors.push(validate_password(&self.password, sign_up));
        if sign_up {
            errors.push(validate_confirmation(
                &self.password,
                &self.confirm_password,
            ));
        }

        if errors.is_empty() {
            Ok(Credentials::new(self.email.clone(), self.password.clone()))
        } else {
            Err(errors)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

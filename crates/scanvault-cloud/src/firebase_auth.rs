//! # Firebase Identity Provider
//!
//! Email/password accounts over the Identity Toolkit and Secure Token REST
//! APIs.
//!
//! ## Authentication Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌────────────────┐     ┌──────────────────┐     ┌─────────────────┐   │
//! │  │  FirebaseAuth  │     │ Identity Toolkit │     │  Secure Token   │   │
//! │  └───────┬────────┘     └────────┬─────────┘     └────────┬────────┘   │
//! │          │ 1. accounts:signInWithPassword / accounts:signUp│            │
//! │          │    {email, password, returnSecureToken}         │            │
//! │          │──────────────────────►│                         │            │
//! │          │ 2. idToken, refreshToken, expiresIn, localId    │            │
//! │          │◄──────────────────────│                         │            │
//! │          │                                                 │            │
//! │          │ 3. persist {uid, email, refresh_token} → session.json        │
//! │          │                                                 │            │
//! │          │ [Restart, or ID token within 5 min of expiry]   │            │
//! │          │ 4. token  grant_type=refresh_token              │            │
//! │          │────────────────────────────────────────────────►│            │
//! │          │ 5. id_token, refresh_token, expires_in          │            │
//! │          │◄────────────────────────────────────────────────│            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Token Storage
//! The ID token lives in memory only. The refresh token is also persisted so
//! the session survives restarts; signing out deletes it.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use scanvault_core::error::AuthResult;
use scanvault_core::{AuthError, Credentials, UserRef};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::{FirebaseConfig, FirebaseEndpoints};
use crate::credentials::{CredentialStore, PersistedSession};
use crate::error::{CloudError, CloudResult};
use crate::identity::IdentityProvider;

/// Margin before token expiration to trigger refresh (5 minutes)
const REFRESH_MARGIN_SECS: u64 = 300;

const HTTP_TIMEOUT_SECS: u64 = 30;

/// Secure Token codes meaning the persisted session can never be refreshed.
const DEAD_SESSION_CODES: &[&str] = &[
    "TOKEN_EXPIRED",
    "INVALID_REFRESH_TOKEN",
    "USER_NOT_FOUND",
    "USER_DISABLED",
    "INVALID_GRANT_TYPE",
];

// =============================================================================
// Token State
// =============================================================================

#[derive(Clone)]
pub struct TokenInfo {
    pub id_token: String,
    /// When the ID token expires (local clock)
    pub expires_at: Instant,
    pub refresh_token: String,
    pub user: UserRef,
}

impl TokenInfo {
    fn new(id_token: String, refresh_token: String, expires_in: &str, user: UserRef) -> Self {
        // A malformed lifetime is treated as already expired.
        let secs = expires_in.trim().parse::<u64>().unwrap_or(0);
        TokenInfo {
            id_token,
            expires_at: Instant::now() + Duration::from_secs(secs),
            refresh_token,
            user,
        }
    }

    /// Check if the token is expired or about to expire
    pub fn needs_refresh(&self) -> bool {
        Instant::now() + Duration::from_secs(REFRESH_MARGIN_SECS) >= self.expires_at
    }

    pub fn remaining_secs(&self) -> u64 {
        self.expires_at
            .saturating_duration_since(Instant::now())
            .as_secs()
    }
}

impl std::fmt::Debug for TokenInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenInfo")
            .field("uid", &self.user.uid)
            .field("remaining_secs", &self.remaining_secs())
            .finish_non_exhaustive()
    }
}

/// Supplies bearer tokens to services that act on behalf of the user.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn bearer_token(&self) -> CloudResult<String>;
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Turns a response into `T`, or into `CloudError::Provider` for an error
/// status.
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> CloudResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|env| env.error.message)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown").to_string());

    Err(CloudError::Provider {
        status: status.as_u16(),
        message,
    })
}

// =============================================================================
// Provider
// =============================================================================

pub struct FirebaseAuth {
    http: reqwest::Client,
    api_key: String,
    endpoints: FirebaseEndpoints,
    session_file: Option<CredentialStore>,
    token: RwLock<Option<TokenInfo>>,
}

impl FirebaseAuth {
    pub fn new(
        config: &FirebaseConfig,
        endpoints: FirebaseEndpoints,
        session_file: Option<CredentialStore>,
    ) -> CloudResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        debug!(
            project_id = %config.project_id,
            auth_domain = %config.auth_domain,
            "Firebase auth configured"
        );

        Ok(FirebaseAuth {
            http,
            api_key: config.api_key.clone(),
            endpoints,
            session_file,
            token: RwLock::new(None),
        })
    }

    /// The signed-in user, without touching the network.
    pub async fn current_user(&self) -> Option<UserRef> {
        self.token.read().await.as_ref().map(|t| t.user.clone())
    }

    async fn password_call(&self, path: &str, credentials: &Credentials) -> CloudResult<UserRef> {
        let url =
            FirebaseEndpoints::with_key(&self.endpoints.identity_toolkit, path, &self.api_key)?;

        let response = self
            .http
            .post(url)
            .json(&PasswordRequest {
                email: &credentials.email,
                password: &credentials.password,
                return_secure_token: true,
            })
            .send()
            .await?;
        let body: PasswordResponse = read_json(response).await?;

        let mut user = UserRef::new(body.local_id);
        user.email = body.email.or_else(|| Some(credentials.email.clone()));

        let token = TokenInfo::new(
            body.id_token,
            body.refresh_token,
            &body.expires_in,
            user.clone(),
        );
        self.install(token).await;
        Ok(user)
    }

    async fn do_refresh(
        &self,
        refresh_token: &str,
        previous: Option<&UserRef>,
    ) -> CloudResult<TokenInfo> {
        let url = FirebaseEndpoints::with_key(&self.endpoints.secure_token, "v1/token", &self.api_key)?;

        let response = self
            .http
            .post(url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;
        let body: RefreshResponse = read_json(response).await?;

        let mut user = UserRef::new(body.user_id);
        user.email = previous
            .filter(|p| p.uid == user.uid)
            .and_then(|p| p.email.clone());

        Ok(TokenInfo::new(body.id_token, body.refresh_token, &body.expires_in, user))
    }

    /// Stores a fresh token in memory and, best effort, on disk.
    async fn install(&self, token: TokenInfo) {
        self.persist(&token).await;
        *self.token.write().await = Some(token);
    }

    /// Writes the token's refresh token to the session file, if any.
    ///
    /// Every new token goes through here: the provider may rotate the
    /// refresh token on any exchange.
    async fn persist(&self, token: &TokenInfo) {
        if let Some(file) = &self.session_file {
            let persisted = PersistedSession {
                uid: token.user.uid.clone(),
                email: token.user.email.clone(),
                refresh_token: token.refresh_token.clone(),
            };
            if let Err(e) = file.save(&persisted).await {
                warn!(error = %e, "Could not persist session; it will not survive a restart");
            }
        }
    }

    async fn forget_persisted(&self) {
        if let Some(file) = &self.session_file {
            if let Err(e) = file.clear().await {
                warn!(error = %e, "Could not delete persisted session");
            }
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn sign_in(&self, credentials: &Credentials) -> AuthResult<UserRef> {
        self.password_call("v1/accounts:signInWithPassword", credentials)
            .await
            .map_err(|e| {
                warn!(error = %e, "Sign-in rejected");
                AuthError::from(e)
            })
    }

    async fn sign_up(&self, credentials: &Credentials) -> AuthResult<UserRef> {
        self.password_call("v1/accounts:signUp", credentials)
            .await
            .map_err(|e| {
                warn!(error = %e, "Sign-up rejected");
                AuthError::from(e)
            })
    }

    async fn sign_out(&self) -> AuthResult<()> {
        if let Some(file) = &self.session_file {
            file.clear()
                .await
                .map_err(|e| AuthError::Provider(e.to_string()))?;
        }
        *self.token.write().await = None;
        Ok(())
    }

    async fn restore(&self) -> AuthResult<Option<UserRef>> {
        let Some(file) = &self.session_file else {
            return Ok(None);
        };

        let persisted = match file.load().await {
            Ok(Some(p)) => p,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted session");
                self.forget_persisted().await;
                return Ok(None);
            }
        };

        let previous = UserRef {
            uid: persisted.uid.clone(),
            email: persisted.email.clone(),
        };

        match self.do_refresh(&persisted.refresh_token, Some(&previous)).await {
            Ok(token) => {
                let user = token.user.clone();
                info!(uid = %user.uid, "Restored persisted session");
                self.install(token).await;
                Ok(Some(user))
            }
            Err(e) if e.provider_code().is_some_and(|c| DEAD_SESSION_CODES.contains(&c)) => {
                info!(error = %e, "Persisted session is no longer valid");
                self.forget_persisted().await;
                Ok(None)
            }
            Err(e) => Err(AuthError::from(e)),
        }
    }
}

#[async_trait]
impl TokenSource for FirebaseAuth {
    /// Returns a valid ID token, refreshing it when close to expiry.
    async fn bearer_token(&self) -> CloudResult<String> {
        {
            let guard = self.token.read().await;
            match guard.as_ref() {
                None => return Err(CloudError::NotSignedIn),
                Some(token) if !token.needs_refresh() => {
                    debug!(remaining_secs = token.remaining_secs(), "Using cached ID token");
                    return Ok(token.id_token.clone());
                }
                Some(_) => {}
            }
        }

        let mut guard = self.token.write().await;

        // Double-check after acquiring write lock
        let Some(current) = guard.as_ref() else {
            return Err(CloudError::NotSignedIn);
        };
        if !current.needs_refresh() {
            return Ok(current.id_token.clone());
        }

        let refreshed = self
            .do_refresh(&current.refresh_token, Some(&current.user))
            .await?;
        info!(expires_in_secs = refreshed.remaining_secs(), "ID token refreshed");

        self.persist(&refreshed).await;
        let id_token = refreshed.id_token.clone();
        *guard = Some(refreshed);
        Ok(id_token)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> FirebaseConfig {
        FirebaseConfig {
            api_key: "test-key".to_string(),
            auth_domain: "demo.firebaseapp.com".to_string(),
            project_id: "demo".to_string(),
            storage_bucket: "demo.appspot.com".to_string(),
            messaging_sender_id: "1".to_string(),
            app_id: "1:1:web:1".to_string(),
            measurement_id: None,
        }
    }

    fn auth(server: &MockServer, session_file: Option<CredentialStore>) -> FirebaseAuth {
        let endpoints = FirebaseEndpoints::single(&server.uri()).unwrap();
        FirebaseAuth::new(&config(), endpoints, session_file).unwrap()
    }

    fn password_ok(uid: &str, expires_in: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "kind": "identitytoolkit#VerifyPasswordResponse",
            "localId": uid,
            "email": "ada@example.com",
            "idToken": format!("id-{uid}"),
            "refreshToken": format!("refresh-{uid}"),
            "expiresIn": expires_in,
        }))
    }

    fn provider_error(message: &str) -> ResponseTemplate {
        ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": message, "errors": [] }
        }))
    }

    fn creds() -> Credentials {
        Credentials::new("ada@example.com", "secret1")
    }

    #[tokio::test]
    async fn test_sign_in_success_persists_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .and(query_param("key", "test-key"))
            .and(body_json(json!({
                "email": "ada@example.com",
                "password": "secret1",
                "returnSecureToken": true
            })))
            .respond_with(password_ok("U1", "3600"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = CredentialStore::in_dir(dir.path());
        let auth = auth(&server, Some(file.clone()));

        let user = auth.sign_in(&creds()).await.unwrap();
        assert_eq!(user.uid, "U1");
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert_eq!(auth.bearer_token().await.unwrap(), "id-U1");

        let persisted = file.load().await.unwrap().unwrap();
        assert_eq!(persisted.refresh_token, "refresh-U1");
    }

    #[tokio::test]
    async fn test_unknown_account_is_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .respond_with(provider_error("EMAIL_NOT_FOUND"))
            .mount(&server)
            .await;

        let auth = auth(&server, None);
        assert_eq!(
            auth.sign_in(&creds()).await.unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert!(auth.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_up_existing_email() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signUp"))
            .respond_with(provider_error("EMAIL_EXISTS"))
            .mount(&server)
            .await;

        let auth = auth(&server, None);
        assert_eq!(
            auth.sign_up(&creds()).await.unwrap_err(),
            AuthError::EmailAlreadyInUse
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let endpoints = FirebaseEndpoints::single("http://127.0.0.1:1").unwrap();
        let auth = FirebaseAuth::new(&config(), endpoints, None).unwrap();
        assert!(matches!(
            auth.sign_in(&creds()).await.unwrap_err(),
            AuthError::Network(_)
        ));
    }

    #[tokio::test]
    async fn test_restore_refreshes_persisted_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=stored"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "expires_in": "3600",
                "token_type": "Bearer",
                "refresh_token": "rotated",
                "id_token": "id-restored",
                "user_id": "U1",
                "project_id": "demo"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = CredentialStore::in_dir(dir.path());
        file.save(&PersistedSession {
            uid: "U1".to_string(),
            email: Some("ada@example.com".to_string()),
            refresh_token: "stored".to_string(),
        })
        .await
        .unwrap();

        let auth = auth(&server, Some(file.clone()));
        let user = auth.restore().await.unwrap().unwrap();
        assert_eq!(user, UserRef::new("U1").with_email("ada@example.com"));
        assert_eq!(auth.bearer_token().await.unwrap(), "id-restored");
        assert_eq!(file.load().await.unwrap().unwrap().refresh_token, "rotated");
    }

    #[tokio::test]
    async fn test_restore_with_revoked_token_clears_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/token"))
            .respond_with(provider_error("TOKEN_EXPIRED"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = CredentialStore::in_dir(dir.path());
        file.save(&PersistedSession {
            uid: "U1".to_string(),
            email: None,
            refresh_token: "stale".to_string(),
        })
        .await
        .unwrap();

        let auth = auth(&server, Some(file.clone()));
        assert_eq!(auth.restore().await.unwrap(), None);
        assert!(file.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore_without_file() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let auth = auth(&server, Some(CredentialStore::in_dir(dir.path())));
        assert_eq!(auth.restore().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed() {
        let server = MockServer::start().await;
        // Lifetime inside the refresh margin forces a refresh on first use.
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .respond_with(password_ok("U1", "60"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "expires_in": "3600",
                "refresh_token": "refresh-2",
                "id_token": "id-fresh",
                "user_id": "U1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = auth(&server, None);
        auth.sign_in(&creds()).await.unwrap();
        assert_eq!(auth.bearer_token().await.unwrap(), "id-fresh");
        assert_eq!(auth.bearer_token().await.unwrap(), "id-fresh");
        assert_eq!(
            auth.current_user().await.unwrap().email.as_deref(),
            Some("ada@example.com")
        );
    }

    #[tokio::test]
    async fn test_refresh_persists_rotated_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .respond_with(password_ok("U1", "60"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/token"))
            .and(body_string_contains("refresh_token=refresh-U1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "expires_in": "3600",
                "refresh_token": "refresh-rotated",
                "id_token": "id-fresh",
                "user_id": "U1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = CredentialStore::in_dir(dir.path());
        let auth = auth(&server, Some(file.clone()));
        auth.sign_in(&creds()).await.unwrap();
        assert_eq!(file.load().await.unwrap().unwrap().refresh_token, "refresh-U1");

        assert_eq!(auth.bearer_token().await.unwrap(), "id-fresh");

        let persisted = file.load().await.unwrap().unwrap();
        assert_eq!(persisted.refresh_token, "refresh-rotated");
        assert_eq!(persisted.uid, "U1");
        assert_eq!(persisted.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn test_sign_out_clears_token_and_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .respond_with(password_ok("U1", "3600"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = CredentialStore::in_dir(dir.path());
        let auth = auth(&server, Some(file.clone()));
        auth.sign_in(&creds()).await.unwrap();

        auth.sign_out().await.unwrap();
        assert!(matches!(
            auth.bearer_token().await,
            Err(CloudError::NotSignedIn)
        ));
        assert!(file.load().await.unwrap().is_none());
    }
}

//! # ScanVault Application Library
//!
//! Wires configuration, the identity gateway and the record store together
//! and runs the terminal shell.
//!
//! ## Module Organization
//! ```text
//! scanvault_lib/
//! ├── lib.rs          ◄─── You are here (bootstrap & run)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── config.rs   ◄─── AppConfig (env, config.toml, defaults)
//! │   ├── session.rs  ◄─── SessionStore (owns the Session)
//! │   └── records.rs  ◄─── RecordsState (Firestore or SQLite)
//! ├── commands/
//! │   ├── mod.rs      ◄─── Command exports
//! │   ├── auth.rs     ◄─── Login / sign-up
//! │   ├── scan.rs     ◄─── Scanner
//! │   └── storage.rs  ◄─── Saved codes
//! ├── platform.rs     ◄─── Camera permission, decoder, URL opener
//! ├── shell.rs        ◄─── Terminal front-end
//! └── error.rs        ◄─── API error type for commands
//! ```

pub mod commands;
pub mod error;
pub mod platform;
pub mod shell;
pub mod state;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use scanvault_cloud::{
    CredentialStore, FirebaseAuth, FirebaseConfig, FirebaseEndpoints, IdentityGateway,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use error::ApiError;
use platform::{
    BarcodeDecoder, CameraPermission, ConsoleInput, LineDecoder, StaticPermission,
    SystemUrlOpener, UrlOpener,
};
use shell::Shell;
use state::{AppConfig, Overrides, RecordsState, SessionStore, StorageBackend};

/// Everything the screens need, built once at startup.
pub struct Services {
    pub session: SessionStore,
    pub records: RecordsState,
    pub permission: Arc<dyn CameraPermission>,
    pub decoder: Arc<dyn BarcodeDecoder>,
    pub opener: Arc<dyn UrlOpener>,
    pub input: Arc<ConsoleInput>,
}

/// Runs the application.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Application Startup                               │
/// │                                                                         │
/// │  1. Initialize Logging ───────────────────────────────────────────────► │
/// │     • tracing-subscriber with env filter, written to stderr             │
/// │                                                                         │
/// │  2. Load Configuration ───────────────────────────────────────────────► │
/// │     • flags > SCANVAULT_* > config.toml > defaults                      │
/// │     • FIREBASE_* (a missing required variable is fatal)                 │
/// │                                                                         │
/// │  3. Build Services ───────────────────────────────────────────────────► │
/// │     • FirebaseAuth with session.json in the data dir                    │
/// │     • Record store: Firestore or the local SQLite vault                 │
/// │     • SessionStore subscribed to the identity gateway                   │
/// │                                                                         │
/// │  4. Run ──────────────────────────────────────────────────────────────► │
/// │     • Restore the persisted session while the splash is shown           │
/// │     • Shell loop until quit / end of input                              │
/// │                                                                         │
/// │  5. Shutdown ─────────────────────────────────────────────────────────► │
/// │     • Close the identity subscription and the local pool                │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(overrides: Overrides) -> anyhow::Result<()> {
    init_tracing();

    info!("Starting ScanVault");

    let config = AppConfig::load(&overrides)?;
    let firebase = FirebaseConfig::from_env()?;
    let services = bootstrap(&config, &firebase).await?;
    info!(backend = services.records.backend(), "Services initialized");

    let mut shell = Shell::new(&services, std::io::stdout());
    let ((), result) = tokio::join!(services.session.start(), shell.run());

    services.session.shutdown();
    services.records.close().await;
    info!("ScanVault stopped");

    result?;
    Ok(())
}

/// Builds the production services for `config`.
pub async fn bootstrap(
    config: &AppConfig,
    firebase: &FirebaseConfig,
) -> Result<Services, ApiError> {
    let endpoints = match &config.firebase_endpoint {
        Some(base) => FirebaseEndpoints::single(base)?,
        None => FirebaseEndpoints::production()?,
    };

    let auth = Arc::new(FirebaseAuth::new(
        firebase,
        endpoints.clone(),
        Some(CredentialStore::in_dir(&config.data_dir)),
    )?);

    let records = match config.backend {
        StorageBackend::Firestore => {
            RecordsState::firestore(config, firebase, &endpoints, auth.clone())?
        }
        StorageBackend::Sqlite => RecordsState::local(config).await?,
    };

    let session = SessionStore::new(Arc::new(IdentityGateway::new(auth)));

    let input = Arc::new(ConsoleInput::stdin());
    Ok(Services {
        session,
        records,
        permission: Arc::new(StaticPermission::new(
            config.camera.status(),
            config.camera.grants_on_request(),
        )),
        decoder: Arc::new(LineDecoder::new(input.clone())),
        opener: Arc::new(SystemUrlOpener),
        input,
    })
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=scanvault=trace` - Show trace for scanvault crates only
/// - Default: INFO, DEBUG for scanvault crates
///
/// Logs go to stderr so they do not interleave with the shell on stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,scanvault=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

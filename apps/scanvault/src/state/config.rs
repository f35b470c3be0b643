//! # Configuration State
//!
//! Application configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Command-line flags (`--data-dir`)
//! 2. Environment variables (`SCANVAULT_*`)
//! 3. Config file (`config.toml`, `--config` or the platform config dir)
//! 4. Defaults (this file)
//!
//! Firebase project settings are not part of this file: they are read from
//! the `FIREBASE_*` variables by `scanvault_cloud::FirebaseConfig`.
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use scanvault_core::{PermissionStatus, SCANS_COLLECTION};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const ENV_BACKEND: &str = "SCANVAULT_BACKEND";
pub const ENV_DATA_DIR: &str = "SCANVAULT_DATA_DIR";
pub const ENV_COLLECTION: &str = "SCANVAULT_COLLECTION";
pub const ENV_CAMERA: &str = "SCANVAULT_CAMERA";
pub const ENV_FIREBASE_ENDPOINT: &str = "SCANVAULT_FIREBASE_ENDPOINT";

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine app data directory")]
    NoDataDir,

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: String, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where scan records are kept.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Firestore `scans` collection of the configured project
    #[default]
    Firestore,

    /// Local SQLite vault in the data directory
    Sqlite,
}

/// How the terminal answers camera permission prompts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    #[default]
    Granted,
    Denied,
    /// Undetermined until asked, then granted
    Prompt,
}

impl CameraMode {
    pub fn status(self) -> PermissionStatus {
        match self {
            CameraMode::Granted => PermissionStatus::Granted,
            CameraMode::Denied => PermissionStatus::Denied,
            CameraMode::Prompt => PermissionStatus::Undetermined,
        }
    }

    pub fn grants_on_request(self) -> bool {
        !matches!(self, CameraMode::Denied)
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: StorageBackend,

    /// Holds `session.json` and, for the SQLite backend, `scanvault.db`
    pub data_dir: PathBuf,

    /// Firestore collection name
    pub collection: String,

    pub camera: CameraMode,

    /// Base URL replacing every Google endpoint, e.g. a local emulator
    pub firebase_endpoint: Option<String>,
}

/// Partial configuration as written in `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub backend: Option<StorageBackend>,
    pub data_dir: Option<PathBuf>,
    pub collection: Option<String>,
    pub camera: Option<CameraMode>,
    pub firebase_endpoint: Option<String>,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    fn defaults(data_dir: PathBuf) -> Self {
        AppConfig {
            backend: StorageBackend::default(),
            data_dir,
            collection: SCANS_COLLECTION.to_string(),
            camera: CameraMode::default(),
            firebase_endpoint: None,
        }
    }

    /// Loads the configuration from every source.
    pub fn load(overrides: &Overrides) -> ConfigResult<Self> {
        let dirs = project_dirs();

        let file_path = overrides.config_file.clone().or_else(|| {
            dirs.as_ref()
                .map(|d| d.config_dir().join(CONFIG_FILE))
                .filter(|p| p.exists())
        });
        let file = match &file_path {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };

        let default_dir = dirs.map(|d| d.data_dir().to_path_buf());
        let env = |name: &str| std::env::var(name).ok();
        let config = Self::resolve(file, env, overrides, default_dir)?;

        info!(
            backend = ?config.backend,
            data_dir = %config.data_dir.display(),
            config_file = ?file_path,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Layers file values, then `lookup`, then command-line overrides on top
    /// of the defaults.
    pub fn resolve<F>(
        file: FileConfig,
        lookup: F,
        overrides: &Overrides,
        default_data_dir: Option<PathBuf>,
    ) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let data_dir = overrides
            .data_dir
            .clone()
            .or_else(|| env(ENV_DATA_DIR).map(PathBuf::from))
            .or(file.data_dir)
            .or(default_data_dir)
            .ok_or(ConfigError::NoDataDir)?;

        let mut config = AppConfig::defaults(data_dir);

        if let Some(backend) = file.backend {
            config.backend = backend;
        }
        if let Some(collection) = file.collection {
            config.collection = collection;
        }
        if let Some(camera) = file.camera {
            config.camera = camera;
        }
        config.firebase_endpoint = file.firebase_endpoint;

        if let Some(value) = env(ENV_BACKEND) {
            config.backend = parse_enum(ENV_BACKEND, &value)?;
        }
        if let Some(value) = env(ENV_COLLECTION) {
            config.collection = value;
        }
        if let Some(value) = env(ENV_CAMERA) {
            config.camera = parse_enum(ENV_CAMERA, &value)?;
        }
        if let Some(value) = env(ENV_FIREBASE_ENDPOINT) {
            config.firebase_endpoint = Some(value);
        }

        Ok(config)
    }

    /// Path of the local vault database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("scanvault.db")
    }
}

impl FileConfig {
    pub fn read(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Read config file");
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Platform directories.
///
/// - **macOS**: `~/Library/Application Support/com.scanvault.scanvault`
/// - **Windows**: `%APPDATA%\scanvault\scanvault`
/// - **Linux**: `~/.local/share/scanvault` and `~/.config/scanvault`
fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "scanvault", "scanvault")
}

/// Parses a lowercase enum value the same way the config file does.
fn parse_enum<T: serde::de::DeserializeOwned>(name: &str, value: &str) -> ConfigResult<T> {
    let normalized = value.trim().to_ascii_lowercase();
    serde_json::from_value(serde_json::Value::String(normalized)).map_err(|_| {
        ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }
    })
}

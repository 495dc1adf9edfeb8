//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHOTIT_*, nested keys split on `__`)
//! 2. TOML config file (if SHOTIT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Which object storage backend holds screenshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Fs,
    S3,
    Memory,
}

/// Object storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Set via SHOTIT_STORAGE__BACKEND (`fs`, `s3`, `memory`).
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory for the `fs` backend.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    /// Bucket name, required for `s3`.
    #[serde(default)]
    pub bucket: Option<String>,

    /// Region override for `s3`.
    #[serde(default)]
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible services (R2, MinIO).
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            root: default_storage_root(),
            bucket: None,
            region: None,
            endpoint_url: None,
        }
    }
}

/// Which capture implementation produces screenshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureBackend {
    /// Local headless Chromium.
    #[default]
    Headless,
    /// Remote browser-rendering HTTP endpoint.
    Remote,
}

/// Screenshot capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Set via SHOTIT_CAPTURE__BACKEND (`headless`, `remote`).
    #[serde(default)]
    pub backend: CaptureBackend,

    /// Endpoint URL, required for `remote`.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Capture timeout in milliseconds.
    #[serde(default = "default_capture_timeout_ms")]
    pub timeout_ms: u64,

    /// Explicit Chromium binary; auto-detected when unset.
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,

    /// Refuse targets that resolve to private or reserved addresses.
    #[serde(default = "default_true")]
    pub block_private_targets: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            backend: CaptureBackend::default(),
            endpoint: None,
            timeout_ms: default_capture_timeout_ms(),
            chrome_executable: None,
            block_private_targets: true,
        }
    }
}

impl CaptureConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHOTIT_*)
/// 2. TOML config file (if SHOTIT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address.
    ///
    /// Set via SHOTIT_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Path to the SQLite analytics database.
    ///
    /// Set via SHOTIT_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Host name shown in homepage examples.
    #[serde(default = "default_public_host")]
    pub public_host: String,

    /// Page featured on the homepage.
    #[serde(default = "default_hero_url")]
    pub hero_url: String,

    /// Number of rows in each homepage leaderboard.
    #[serde(default = "default_homepage_limit")]
    pub homepage_limit: usize,

    /// Whether `@refresh` is limited to once per day per URL and modifier set.
    ///
    /// Set via SHOTIT_REFRESH_LIMIT_ENABLED environment variable.
    #[serde(default = "default_true")]
    pub refresh_limit_enabled: bool,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub capture: CaptureConfig,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shotit-analytics.sqlite")
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./shotit-data")
}

fn default_public_host() -> String {
    "screenshotit.app".into()
}

fn default_hero_url() -> String {
    "https://linear.app".into()
}

fn default_homepage_limit() -> usize {
    10
}

fn default_capture_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: default_db_path(),
            public_host: default_public_host(),
            hero_url: default_hero_url(),
            homepage_limit: default_homepage_limit(),
            refresh_limit_enabled: true,
            storage: StorageConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHOTIT_`
    /// 2. TOML file from `SHOTIT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHOTIT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHOTIT_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(figment)
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `bind_addr` is not `host:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr.parse().map_err(|e| ConfigError::Invalid {
            field: "bind_addr".into(),
            reason: format!("{e}"),
        })
    }
}

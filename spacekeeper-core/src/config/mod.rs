//! Configuration for the snapshot and restoration engine
//!
//! Defaults work out of the box; every setting can be overridden from a
//! TOML file or from `SPACEKEEPER_*` environment variables (environment
//! wins over file, file wins over defaults).

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Document store collection names
    pub store: StoreConfig,

    /// Capture-side behavior
    pub capture: CaptureConfig,

    /// Restore-side pacing and grant handling
    pub restore: RestoreConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Collection names in the document store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub snapshot_collection: String,
    pub grant_collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_collection: "space_snapshots".to_string(),
            grant_collection: "delegation_grants".to_string(),
        }
    }
}

/// Capture-side settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Skip auto-created default channels so restores do not duplicate them
    pub exclude_default_channels: bool,

    /// Channel names (case-insensitive) treated as auto-created defaults
    pub default_channel_names: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            exclude_default_channels: true,
            default_channel_names: vec!["general".to_string()],
        }
    }
}

/// Restore-side settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreConfig {
    /// Post-call delay after role/channel/overwrite creation
    #[serde(with = "humantime_serde")]
    pub creation_delay: Duration,

    /// Post-call delay after member re-admission
    #[serde(with = "humantime_serde")]
    pub admission_delay: Duration,

    /// A grant expiring sooner than this is treated as absent
    #[serde(with = "humantime_serde")]
    pub grant_expiry_margin: Duration,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            creation_delay: Duration::from_millis(500),
            admission_delay: Duration::from_secs(2),
            grant_expiry_margin: Duration::from_secs(300),
        }
    }
}

/// Logging settings, consumed by `logging::init_from_config`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Defaults plus `SPACEKEEPER_*` environment overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load a TOML config file, then apply environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Parse a TOML document into a config
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = env::var("SPACEKEEPER_SNAPSHOT_COLLECTION") {
            self.store.snapshot_collection = v;
        }
        if let Ok(v) = env::var("SPACEKEEPER_GRANT_COLLECTION") {
            self.store.grant_collection = v;
        }
        if let Ok(v) = env::var("SPACEKEEPER_EXCLUDE_DEFAULT_CHANNELS") {
            self.capture.exclude_default_channels = parse_var("SPACEKEEPER_EXCLUDE_DEFAULT_CHANNELS", &v)?;
        }
        if let Ok(v) = env::var("SPACEKEEPER_CREATION_DELAY_MS") {
            self.restore.creation_delay =
                Duration::from_millis(parse_var("SPACEKEEPER_CREATION_DELAY_MS", &v)?);
        }
        if let Ok(v) = env::var("SPACEKEEPER_ADMISSION_DELAY_MS") {
            self.restore.admission_delay =
                Duration::from_millis(parse_var("SPACEKEEPER_ADMISSION_DELAY_MS", &v)?);
        }
        if let Ok(v) = env::var("SPACEKEEPER_GRANT_EXPIRY_MARGIN_SECS") {
            self.restore.grant_expiry_margin =
                Duration::from_secs(parse_var("SPACEKEEPER_GRANT_EXPIRY_MARGIN_SECS", &v)?);
        }
        if let Ok(v) = env::var("SPACEKEEPER_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = env::var("SPACEKEEPER_LOG_JSON") {
            self.logging.json_format = parse_var("SPACEKEEPER_LOG_JSON", &v)?;
        }
        Ok(())
    }

    /// Semantic validation beyond what parsing enforces
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.snapshot_collection.is_empty() {
            return Err(ConfigError::Validation(
                "store.snapshot_collection must not be empty".to_string(),
            ));
        }
        if self.store.grant_collection.is_empty() {
            return Err(ConfigError::Validation(
                "store.grant_collection must not be empty".to_string(),
            ));
        }
        if self.store.snapshot_collection == self.store.grant_collection {
            return Err(ConfigError::Validation(
                "snapshot and grant collections must differ".to_string(),
            ));
        }
        if self.restore.grant_expiry_margin.is_zero() {
            return Err(ConfigError::Validation(
                "restore.grant_expiry_margin must be non-zero".to_string(),
            ));
        }
        if self.capture.exclude_default_channels
            && self.capture.default_channel_names.iter().any(|n| n.is_empty())
        {
            return Err(ConfigError::Validation(
                "capture.default_channel_names entries must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

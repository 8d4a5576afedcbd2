//! Configuration Module
//!
//! Handles configuration loading, validation, and persistence.

use crate::client::PictureType;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wastore")
        .join("wastore.db")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rolling log files
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Switches for the optional passes of contact sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Fill missing contact names from push name or JID after writes
    #[serde(default)]
    pub fill_empty_names: bool,

    /// Look up profile pictures for contacts without one
    #[serde(default = "default_enabled")]
    pub fetch_profile_pictures: bool,

    #[serde(default)]
    pub picture_type: PictureType,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fill_empty_names: false,
            fetch_profile_pictures: default_enabled(),
            picture_type: PictureType::Preview,
        }
    }
}

fn default_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. Default values
    /// 2. System config: ~/.config/wastore/config.toml
    /// 3. Local config: ./wastore.toml
    /// 4. Environment variables
    pub fn load() -> Result<Self> {
        tracing::debug!("Loading configuration...");

        let mut config = Self::default();

        if let Some(system_config_path) = Self::system_config_path()
            && system_config_path.exists()
        {
            tracing::debug!("Loading system config from: {:?}", system_config_path);
            config = Self::load_file(&system_config_path)?;
        }

        let local_config_path = Self::local_config_path();
        if local_config_path.exists() {
            tracing::debug!("Loading local config from: {:?}", local_config_path);
            config = Self::load_file(&local_config_path)?;
        }

        config = Self::apply_env_overrides(config)?;

        tracing::debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from a specific file, then apply environment
    /// overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from custom path: {:?}", path);

        if !path.exists() {
            anyhow::bail!("Config file not found: {:?}", path);
        }
        let config = Self::load_file(path)?;
        Self::apply_env_overrides(config)
    }

    /// ~/.config/wastore/config.toml
    pub fn system_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wastore").join("config.toml"))
    }

    /// ./wastore.toml
    pub fn local_config_path() -> PathBuf {
        PathBuf::from("./wastore.toml")
    }

    /// A later file replaces earlier sections wholesale; missing sections
    /// fall back to defaults.
    fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    fn apply_env_overrides(config: Self) -> Result<Self> {
        Self::apply_overrides(config, |key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(mut config: Self, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = var("WASTORE_DB_PATH") {
            config.database.path = PathBuf::from(db_path);
        }

        if let Some(log_level) = var("WASTORE_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        if let Some(log_file) = var("WASTORE_LOG_FILE") {
            config.logging.file = Some(PathBuf::from(log_file));
        }

        if let Some(fill) = var("WASTORE_FILL_EMPTY_NAMES") {
            config.sync.fill_empty_names = fill
                .parse()
                .context("Invalid WASTORE_FILL_EMPTY_NAMES, expected true or false")?;
        }

        if let Some(pictures) = var("WASTORE_PROFILE_PICTURES") {
            config.sync.fetch_profile_pictures = pictures
                .parse()
                .context("Invalid WASTORE_PROFILE_PICTURES, expected true or false")?;
        }

        if let Some(kind) = var("WASTORE_PICTURE_TYPE") {
            config.sync.picture_type = kind
                .parse()
                .context("Invalid WASTORE_PICTURE_TYPE")?;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        tracing::debug!("Validating configuration...");

        if let Some(parent) = self.database.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            tracing::warn!(
                "Database parent directory does not exist, will be created: {:?}",
                parent
            );
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Configuration saved to: {:?}", path);
        Ok(())
    }
}

//! Configuration management for PriceScout.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{CoreError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main application configuration.
///
/// This is loaded from `~/.config/pricescout/config.toml` (or platform
/// equivalent). If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Scraping behavior settings
    pub scraping: ScrapingConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `PRICESCOUT_HEADLESS`: Override browser headless mode (true/false)
    /// - `PRICESCOUT_SESSION_TTL_HOURS`: Override session cache TTL
    /// - `PRICESCOUT_MAX_RETRIES`: Override transient-failure retry ceiling
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;

        if let Ok(val) = std::env::var("PRICESCOUT_HEADLESS") {
            if let Ok(headless) = val.parse() {
                config.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("PRICESCOUT_SESSION_TTL_HOURS") {
            if let Ok(hours) = val.parse() {
                config.scraping.session_ttl_hours = hours;
                tracing::debug!("Override scraping.session_ttl_hours from env: {}", hours);
            }
        }

        if let Ok(val) = std::env::var("PRICESCOUT_MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                config.scraping.max_retries = retries;
                tracing::debug!("Override scraping.max_retries from env: {}", retries);
            }
        }

        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path.parent().ok_or_else(|| {
            CoreError::Validation("config path has no parent directory".to_string())
        })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/pricescout/config.toml`
    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the cache directory path, used for the session store.
    ///
    /// Uses XDG base directories: `~/.cache/pricescout`
    pub fn cache_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.cache_dir().to_path_buf())
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/pricescout`
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "pricescout", "pricescout").ok_or(CoreError::NoConfigDir)
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run the browser headless (no visible window)
    pub headless: bool,
    /// Navigation timeout in milliseconds
    pub navigation_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            navigation_timeout_ms: 30_000,
        }
    }
}

/// Scraping behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Retry ceiling for transient anti-bot/network failures
    pub max_retries: u32,
    /// Session cache time-to-live in hours
    pub session_ttl_hours: u64,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            session_ttl_hours: 24,
        }
    }
}

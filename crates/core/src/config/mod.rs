//! Store configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FILECACHE_*)
//! 2. TOML config file (if FILECACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// How `save` replaces the backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Write a sibling temp file, then rename it over the cache file.
    #[default]
    Atomic,
    /// Truncate the cache file and rewrite it in place.
    InPlace,
}

/// Store configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FILECACHE_*)
/// 2. TOML config file (if FILECACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one file per cache identifier.
    ///
    /// Set via FILECACHE_DIR environment variable.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Expiry applied by `CacheDir::open_default`, in seconds. 0 never expires.
    ///
    /// Set via FILECACHE_DEFAULT_EXPIRY_SECS environment variable.
    #[serde(default)]
    pub default_expiry_secs: u64,

    /// Save strategy.
    ///
    /// Set via FILECACHE_WRITE_MODE environment variable (`atomic` or `in_place`).
    #[serde(default)]
    pub write_mode: WriteMode,

    /// Create `dir` (and parents) when building a `CacheDir` from this config.
    ///
    /// Set via FILECACHE_CREATE_DIR environment variable.
    #[serde(default = "default_true")]
    pub create_dir: bool,
}

fn default_dir() -> PathBuf {
    PathBuf::from("./.filecache")
}

fn default_true() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { dir: default_dir(), default_expiry_secs: 0, write_mode: WriteMode::default(), create_dir: true }
    }
}

impl StoreConfig {
    /// Default expiry as a Duration.
    pub fn default_expiry(&self) -> Duration {
        Duration::from_secs(self.default_expiry_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FILECACHE_`
    /// 2. TOML file from `FILECACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed, or
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("FILECACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("FILECACHE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into()),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

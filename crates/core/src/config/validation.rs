//! Configuration validation rules.
//!
//! This module provides validation logic for `StoreConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::StoreConfig;
use thiserror::Error;

/// Upper bound for `default_expiry_secs` (ten years).
const MAX_EXPIRY_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl StoreConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `dir` is empty
    /// - `default_expiry_secs` exceeds ten years
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid { field: "dir".into(), reason: "must not be empty".into() });
        }

        if self.default_expiry_secs > MAX_EXPIRY_SECS {
            return Err(ConfigError::Invalid {
                field: "default_expiry_secs".into(),
                reason: format!("must not exceed ten years ({MAX_EXPIRY_SECS}s)"),
            });
        }

        if self.dir.is_file() {
            tracing::warn!(dir = %self.dir.display(), "Cache dir points at a regular file; opens will fail");
        }

        Ok(())
    }
}

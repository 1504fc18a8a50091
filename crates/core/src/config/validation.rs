//! Configuration validation rules.
//!
//! Validation runs on values after they have been loaded from the
//! environment, files, or defaults.

use crate::config::CacheSection;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl CacheSection {
    /// Validate the values a usable `cache` table may carry.
    ///
    /// An unknown or missing `backend` is not an error here; it is
    /// handled by falling back to the default store.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `ttl_secs` is 0
    /// - `namespace` is empty
    /// - `path` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_secs == Some(0) {
            return Err(ConfigError::Invalid { field: "cache.ttl_secs".into(), reason: "must be greater than 0".into() });
        }

        if self.namespace.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Invalid { field: "cache.namespace".into(), reason: "must not be empty".into() });
        }

        if self.path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            return Err(ConfigError::Invalid { field: "cache.path".into(), reason: "must not be empty".into() });
        }

        Ok(())
    }
}

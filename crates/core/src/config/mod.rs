//! Layered configuration for the cache layer.
//!
//! Configuration is loaded with figment from multiple sources:
//!
//! 1. Environment variables (REPLAY_*, nested keys split on `__`)
//! 2. TOML config file (if REPLAY_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The `cache` table selects the response store. A table that does not
//! name a usable backend is discarded with a warning and the default
//! store is used instead.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::cache::{CacheHandle, FileCache, MemoryCache, StoreSettings, default_db_path};
use crate::Error;

mod validation;

pub use validation::ConfigError;

/// Prefix of every environment variable read by [`load`].
pub const ENV_PREFIX: &str = "REPLAY_";

/// Environment variable naming an optional TOML config file.
pub const CONFIG_FILE_ENV: &str = "REPLAY_CONFIG_FILE";

/// The `cache` table of the configuration.
///
/// Every field is optional; `backend` must be `"file"` (alias `"sqlite"`)
/// or `"memory"` for the table to be honoured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSection {
    /// Store kind: `file`/`sqlite` or `memory`.
    #[serde(default)]
    pub backend: Option<String>,

    /// Database path for the file store (default: system temp dir).
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Namespace for the file store (default: `replay-client`).
    #[serde(default)]
    pub namespace: Option<String>,

    /// Entry lifetime in seconds (default: one day).
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

/// What to do when the cache store itself fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheFailurePolicy {
    /// Log a warning, treat failed reads as misses and failed writes as no-ops.
    #[default]
    FailSoft,
    /// Propagate store errors to the caller.
    Strict,
}

/// A resolved store selection, ready to be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    File { path: PathBuf, settings: StoreSettings },
    Memory { ttl: Option<Duration> },
}

impl Default for CacheBackend {
    fn default() -> Self {
        CacheBackend::File { path: default_db_path(), settings: StoreSettings::default() }
    }
}

impl CacheBackend {
    /// Resolve an optional `cache` table into a backend.
    ///
    /// An absent table silently selects the default file store. A table
    /// whose `backend` is missing or unknown is discarded with a warning,
    /// whatever else it holds.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when a table naming a usable backend
    /// fails [`CacheSection::validate`].
    pub fn from_section(section: Option<&CacheSection>) -> Result<Self, ConfigError> {
        let Some(section) = section else {
            return Ok(Self::default());
        };

        let ttl = section.ttl_secs.map(Duration::from_secs);

        match section.backend.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("file" | "sqlite") => {
                section.validate()?;
                let mut settings = StoreSettings::default();
                if let Some(namespace) = &section.namespace {
                    settings.namespace = namespace.clone();
                }
                if let Some(ttl) = ttl {
                    settings.ttl = ttl;
                }
                Ok(CacheBackend::File { path: section.path.clone().unwrap_or_else(default_db_path), settings })
            }
            Some("memory") => {
                section.validate()?;
                Ok(CacheBackend::Memory { ttl })
            }
            other => {
                tracing::warn!(
                    backend = other.unwrap_or("<none>"),
                    "cache configuration does not name a usable backend; falling back to the default file store"
                );
                Ok(Self::default())
            }
        }
    }

    /// Construct the store this backend describes.
    pub async fn open(&self) -> Result<Arc<dyn CacheHandle>, Error> {
        match self {
            CacheBackend::File { path, settings } => Ok(Arc::new(FileCache::open(path, settings.clone()).await?)),
            CacheBackend::Memory { ttl: Some(ttl) } => Ok(Arc::new(MemoryCache::with_ttl(*ttl))),
            CacheBackend::Memory { ttl: None } => Ok(Arc::new(MemoryCache::new())),
        }
    }
}

/// Build the figment used by [`load`] on top of `defaults`.
///
/// Priority (highest wins):
/// 1. Environment variables prefixed with `REPLAY_`
/// 2. TOML file from `REPLAY_CONFIG_FILE` (if set)
/// 3. `defaults`
pub fn figment<T: Serialize>(defaults: &T) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(defaults));

    if let Ok(config_path) = std::env::var(CONFIG_FILE_ENV) {
        figment = figment.merge(Toml::file(&config_path));
    }

    figment.merge(
        Env::prefixed(ENV_PREFIX)
            .map(|key| key.as_str().to_lowercase().into())
            .split("__"),
    )
}

/// Load a configuration value from all sources with layered precedence.
///
/// # Errors
///
/// Returns `ConfigError::LoadFailed` if the file cannot be read or a value
/// cannot be parsed into `T`.
pub fn load<T: Serialize + DeserializeOwned + Default>() -> Result<T, ConfigError> {
    figment(&T::default())
        .extract()
        .map_err(|e| ConfigError::LoadFailed(e.to_string()))
}

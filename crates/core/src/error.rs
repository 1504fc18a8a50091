//! Unified error types for replay.
//!
//! Display strings carry a stable upper-case code prefix so callers can
//! match on the category without depending on the variant layout.

use tokio_rusqlite::rusqlite;

use crate::cache::codec::CodecError;
use crate::config::ConfigError;

/// Unified error type shared by the cache store and the client layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored response could not be encoded or decoded.
    #[error("CACHE_CODEC: {0}")]
    Codec(#[from] CodecError),

    /// A response still holding a live body was handed to the store.
    #[error("CACHE_ERROR: response body has not been materialized")]
    NotMaterialized,

    /// Configuration could not be loaded or failed validation.
    #[error("CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    /// The outbound request could not be turned into a network request.
    #[error("INVALID_REQUEST: {0}")]
    InvalidRequest(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Network or protocol failure while talking to the origin.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Any other failure reported by a delegate implementation.
    #[error("DELEGATE_ERROR: {0}")]
    Delegate(String),

    /// Navigation failed (no page loaded, link not found, empty history).
    #[error("NAVIGATION_ERROR: {0}")]
    Navigation(String),
}

impl Error {
    /// Whether the error originated in the cache store rather than the network.
    pub fn is_cache_error(&self) -> bool {
        matches!(self, Error::Database(_) | Error::MigrationFailed(_) | Error::Codec(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

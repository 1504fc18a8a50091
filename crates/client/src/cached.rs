//! Caching decorator around a [`Delegate`].
//!
//! Requests are keyed by their exact serialized form ([`Request::cache_key`]).
//! On a hit the stored response is replayed without touching the network;
//! on a miss the delegate performs the request, the body is fully decoded,
//! and the normalized response is written back under the same key.
//!
//! Because the key covers every header, a request that differs only by an
//! injected header such as `Referer` misses even when the URL matches.

use std::sync::Arc;

use async_trait::async_trait;
use replay_core::cache::codec;
use replay_core::{CacheBackend, CacheFailurePolicy, CacheHandle, CacheSection, Error, FileCache};
use serde::{Deserialize, Serialize};

use crate::delegate::{Delegate, FromConfig, RequestOptions};
use crate::http::{Request, Response};

/// Configuration for [`CachedAgent::from_config`].
///
/// `delegate` is handed to the delegate's own constructor as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CachedAgentConfig<C> {
    /// Store selection; absent means the default file store.
    #[serde(default)]
    pub cache: Option<CacheSection>,

    /// Handling of store failures (default: fail_soft).
    #[serde(default)]
    pub on_cache_error: CacheFailurePolicy,

    #[serde(default)]
    pub delegate: C,
}

/// A delegate wrapper that replays previously seen responses.
pub struct CachedAgent<D> {
    delegate: D,
    cache: Arc<dyn CacheHandle>,
    on_cache_error: CacheFailurePolicy,
    cached: Option<bool>,
}

impl<D: Delegate> CachedAgent<D> {
    /// Wrap `delegate` with the default store: the shared SQLite file in the
    /// system temp directory, namespace `replay-client`, one-day TTL.
    pub async fn new(delegate: D) -> Result<Self, Error> {
        let cache = FileCache::open_default().await?;
        Ok(Self::with_cache(delegate, Arc::new(cache)))
    }

    /// Wrap `delegate` with a caller-owned store.
    pub fn with_cache(delegate: D, cache: Arc<dyn CacheHandle>) -> Self {
        Self { delegate, cache, on_cache_error: CacheFailurePolicy::default(), cached: None }
    }

    pub fn on_cache_error(mut self, policy: CacheFailurePolicy) -> Self {
        self.on_cache_error = policy;
        self
    }

    /// Perform `request`, replaying a cached response when one exists.
    pub async fn perform_request(&mut self, request: &Request) -> Result<Response, Error> {
        self.perform_request_with(request, &RequestOptions::default()).await
    }

    /// Like [`perform_request`](Self::perform_request), passing `options`
    /// to the delegate on a miss.
    pub async fn perform_request_with(&mut self, request: &Request, options: &RequestOptions) -> Result<Response, Error> {
        let key = request.cache_key();

        if let Some(response) = lookup(&*self.cache, self.on_cache_error, &key).await? {
            tracing::debug!(method = %request.method, url = %request.url, "replaying cached response");
            self.cached = Some(true);
            return Ok(response);
        }

        let mut response = self.delegate.perform_request(request, options).await?;
        response.materialize().await?;

        let payload = codec::encode(&response.to_stored()?)?;
        store(&*self.cache, self.on_cache_error, &key, payload).await?;

        tracing::debug!(method = %request.method, url = %request.url, status = response.status, "cached live response");
        self.cached = Some(false);
        Ok(response)
    }

    /// Provenance of the last response returned.
    ///
    /// `Some(true)` after a replay, `Some(false)` after a live fetch,
    /// `None` before the first request.
    pub fn is_cached(&self) -> Option<bool> {
        self.cached
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    pub fn into_inner(self) -> D {
        self.delegate
    }

    /// The store this agent reads and writes.
    pub fn cache(&self) -> &Arc<dyn CacheHandle> {
        &self.cache
    }
}

impl<D: Delegate + FromConfig> CachedAgent<D> {
    /// Build the delegate from `config.delegate` and the store from
    /// `config.cache`.
    ///
    /// A `cache` table that names no usable backend is replaced by the
    /// default store with a warning.
    pub async fn from_config(config: CachedAgentConfig<D::Config>) -> Result<Self, Error> {
        let cache = CacheBackend::from_section(config.cache.as_ref())?.open().await?;
        let delegate = D::from_config(config.delegate)?;

        Ok(Self::with_cache(delegate, cache).on_cache_error(config.on_cache_error))
    }

    /// Load configuration from `REPLAY_*` variables and `REPLAY_CONFIG_FILE`,
    /// then build as [`from_config`](Self::from_config).
    pub async fn from_env() -> Result<Self, Error> {
        let config: CachedAgentConfig<D::Config> = replay_core::config::load()?;
        Self::from_config(config).await
    }
}

async fn lookup(cache: &dyn CacheHandle, policy: CacheFailurePolicy, key: &str) -> Result<Option<Response>, Error> {
    let bytes = match cache.get(key).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return Ok(None),
        Err(e) if policy == CacheFailurePolicy::Strict => return Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "cache read failed; treating as a miss");
            return Ok(None);
        }
    };

    match codec::decode(&bytes) {
        Ok(stored) => Ok(Some(Response::from_stored(stored))),
        Err(e) => {
            tracing::warn!(error = %e, "discarding undecodable cache entry");
            Ok(None)
        }
    }
}

async fn store(cache: &dyn CacheHandle, policy: CacheFailurePolicy, key: &str, payload: Vec<u8>) -> Result<(), Error> {
    match cache.set(key, payload).await {
        Ok(()) => Ok(()),
        Err(e) if policy == CacheFailurePolicy::Strict => Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "cache write failed; response not cached");
            Ok(())
        }
    }
}

#[async_trait]
impl<D: Delegate> Delegate for CachedAgent<D> {
    async fn perform_request(&mut self, request: &Request, options: &RequestOptions) -> Result<Response, Error> {
        self.perform_request_with(request, options).await
    }
}

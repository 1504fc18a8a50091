//! The key/value contract every response store satisfies.

use std::sync::Arc;

use async_trait::async_trait;

use crate::Error;

/// A key to bytes store used to persist serialized responses.
///
/// Implementations own expiry and eviction; callers only read and write.
/// What was `set` must be returned by `get` until the store decides
/// otherwise.
#[async_trait]
pub trait CacheHandle: Send + Sync {
    /// Fetch the bytes stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Store `value` under `key`, replacing any previous entry.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), Error>;
}

#[async_trait]
impl<T: CacheHandle + ?Sized> CacheHandle for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), Error> {
        (**self).set(key, value).await
    }
}

#[async_trait]
impl<T: CacheHandle + ?Sized> CacheHandle for &T {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), Error> {
        (**self).set(key, value).await
    }
}

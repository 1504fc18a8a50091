//! Response entry operations on the file-backed store.
//!
//! Every query is scoped to the store's namespace. Expired rows stay on
//! disk until purged but are never returned by `get`.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::FileCache;
use super::handle::CacheHandle;
use super::hash::key_digest;
use crate::Error;

/// Upper bound on entry lifetime, keeping expiry timestamps in the four-digit-year range.
const MAX_TTL_DAYS: i64 = 36_500;

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl FileCache {
    /// Delete the entry stored under `key`.
    ///
    /// Returns whether an entry was removed.
    pub async fn remove(&self, key: &str) -> Result<bool, Error> {
        let namespace = self.settings.namespace.clone();
        let key_hash = key_digest(&namespace, key);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM responses WHERE namespace = ?1 AND key_hash = ?2",
                    params![namespace, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete expired entries in this namespace.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let namespace = self.settings.namespace.clone();
        let now = timestamp(Utc::now());
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM responses WHERE namespace = ?1 AND expires_at <= ?2",
                    params![namespace, now],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry in this namespace.
    ///
    /// Returns the number of deleted entries.
    pub async fn clear(&self) -> Result<u64, Error> {
        let namespace = self.settings.namespace.clone();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM responses WHERE namespace = ?1", params![namespace])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of rows in this namespace, expired ones included.
    pub async fn len(&self) -> Result<u64, Error> {
        let namespace = self.settings.namespace.clone();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM responses WHERE namespace = ?1", params![namespace], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}

#[async_trait]
impl CacheHandle for FileCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let namespace = self.settings.namespace.clone();
        let key_hash = key_digest(&namespace, key);
        let now = timestamp(Utc::now());
        self.conn
            .call(move |conn| -> Result<Option<Vec<u8>>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT payload FROM responses
                     WHERE namespace = ?1 AND key_hash = ?2 AND expires_at > ?3",
                )?;

                match stmt.query_row(params![namespace, key_hash, now], |row| row.get(0)) {
                    Ok(payload) => Ok(Some(payload)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace the entry under `key`, restarting its TTL.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), Error> {
        let namespace = self.settings.namespace.clone();
        let key_hash = key_digest(&namespace, key);
        let cache_key = key.to_string();
        let max_ttl = chrono::Duration::days(MAX_TTL_DAYS);
        let ttl = chrono::Duration::from_std(self.settings.ttl).unwrap_or(max_ttl).min(max_ttl);
        let stored_at = Utc::now();
        let expires_at = stored_at + ttl;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO responses (namespace, key_hash, cache_key, payload, stored_at, expires_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(namespace, key_hash) DO UPDATE SET
                        cache_key = excluded.cache_key,
                        payload = excluded.payload,
                        stored_at = excluded.stored_at,
                        expires_at = excluded.expires_at",
                    params![namespace, key_hash, cache_key, value, timestamp(stored_at), timestamp(expires_at)],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

//! Database connection management with pragma configuration.
//!
//! Opens the SQLite file behind the default response store, applies the
//! pragmas required for concurrent access (WAL mode), and runs migrations.

use std::path::Path;
use std::time::Duration;

use super::migrations;
use crate::Error;
use tokio_rusqlite::Connection;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "replay-client";

/// Entry lifetime used when none is configured (one day).
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// File name of the default database inside the system temp directory.
pub const DEFAULT_DB_FILE: &str = "replay-cache.sqlite";

/// Per-store settings for [`FileCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Partition of the database this store reads and writes.
    pub namespace: String,
    /// Lifetime applied to every entry written.
    pub ttl: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { namespace: DEFAULT_NAMESPACE.to_string(), ttl: DEFAULT_TTL }
    }
}

/// Local-file response store.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Clones share the connection.
#[derive(Clone, Debug)]
pub struct FileCache {
    pub(crate) conn: Connection,
    pub(crate) settings: StoreSettings,
}

impl FileCache {
    /// Open a store backed by the database at `path`.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>, settings: StoreSettings) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn, settings).await
    }

    /// Open the default store: the shared database in the system temp
    /// directory, default namespace and one-day TTL.
    pub async fn open_default() -> Result<Self, Error> {
        Self::open(default_db_path(), StoreSettings::default()).await
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory(settings: StoreSettings) -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn, settings).await
    }

    async fn init(conn: Connection, settings: StoreSettings) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;
                 PRAGMA foreign_keys=ON;",
            )?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        tracing::debug!(namespace = %settings.namespace, ttl_secs = settings.ttl.as_secs(), "opened response store");

        Ok(Self { conn, settings })
    }

    /// A handle onto another namespace of the same database.
    pub fn namespaced(&self, namespace: impl Into<String>) -> Self {
        Self { conn: self.conn.clone(), settings: StoreSettings { namespace: namespace.into(), ..self.settings.clone() } }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }
}

/// Location of the database opened by [`FileCache::open_default`].
pub fn default_db_path() -> std::path::PathBuf {
    std::env::temp_dir().join(DEFAULT_DB_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = FileCache::open_in_memory(StoreSettings::default()).await.unwrap();
        let version = db
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }

    #[tokio::test]
    async fn test_open_file_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");
        FileCache::open(&path, StoreSettings::default()).await.unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_default_settings() {
        let settings = StoreSettings::default();
        assert_eq!(settings.namespace, "replay-client");
        assert_eq!(settings.ttl, Duration::from_secs(86_400));
    }

    #[tokio::test]
    async fn test_namespaced_shares_connection() {
        let db = FileCache::open_in_memory(StoreSettings::default()).await.unwrap();
        let other = db.namespaced("other");
        assert_eq!(other.settings().namespace, "other");
        assert_eq!(other.settings().ttl, db.settings().ttl);
    }
}

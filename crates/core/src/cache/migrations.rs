//! Database schema migrations.
//!
//! Uses a version table to track applied migrations. Each migration is a
//! SQL batch applied at most once, in order.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Ordered (version, SQL) pairs; versions must increase.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_responses.sql"))];

/// Run any pending migrations.
///
/// # Errors
///
/// Returns an error if a migration SQL fails to execute.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(Error::from)?;

        let current: i64 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))
            .map_err(Error::from)?;

        for &(version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
            tracing::debug!(version, "applying cache migration");
            conn.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            conn.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )
            .map_err(Error::from)?;
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

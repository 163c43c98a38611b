//! Cache storage schema migrations.
//!
//! A `_migrations` table records the highest applied version; each pending
//! migration runs inside its own transaction together with its version row.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Ordered migration list: (version, SQL).
///
/// All statements are idempotent (`IF NOT EXISTS`), so replaying a batch
/// after a crash between the DDL and the version insert is harmless.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_cache_stores.sql")),
    (2, include_str!("../../migrations/002_store_order.sql")),
];

/// Apply every migration newer than the recorded version.
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
        )?;

        let current: i64 =
            conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for (version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            tracing::debug!(version, "applied cache storage migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

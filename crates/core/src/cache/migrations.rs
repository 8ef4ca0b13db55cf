//! Database schema migrations.
//!
//! Uses a simple version table approach to track applied migrations. The
//! same list is applied to every engine; each entry renders its SQL for the
//! engine's dialect.

use sqlx::AnyPool;
use tokio_rusqlite::Connection;
use rusqlite::{self, params};

use super::dialect::Dialect;
use crate::error::{Error, StorageError};

/// Migration list: (version, SQL for a dialect).
///
/// Migrations must be applied in order. All of them are idempotent using
/// CREATE IF NOT EXISTS. Version 0 is reserved for the `_migrations` table.
const MIGRATIONS: &[(i64, fn(Dialect) -> &'static str)] = &[(1, Dialect::create_cache_table)];

fn failed(version: i64, source: impl Into<StorageError>) -> Error {
    Error::MigrationFailed { version, source: source.into() }
}

/// Run any pending migrations on a SQLite connection.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` if a migration SQL fails to execute.
pub async fn run_sqlite(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| Ok(apply_sqlite(conn)))
        .await
        .map_err(|e| failed(0, e))?
}

fn apply_sqlite(conn: &mut rusqlite::Connection) -> Result<(), Error> {
    let dialect = Dialect::Sqlite;
    conn.execute(dialect.create_migrations_table(), []).map_err(|e| failed(0, e))?;

    let current: i64 = conn
        .query_row(dialect.current_migration(), [], |row| row.get(0))
        .map_err(|e| failed(0, e))?;

    for (version, sql) in MIGRATIONS {
        if *version > current {
            conn.execute_batch(sql(dialect)).map_err(|e| failed(*version, e))?;
            conn.execute(dialect.record_migration(), params![version, chrono::Utc::now().to_rfc3339()])
                .map_err(|e| failed(*version, e))?;
        }
    }

    Ok(())
}

/// Run any pending migrations through a MySQL or PostgreSQL pool.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` if a migration SQL fails to execute.
pub async fn run_pooled(pool: &AnyPool, dialect: Dialect) -> Result<(), Error> {
    sqlx::query(dialect.create_migrations_table())
        .execute(pool)
        .await
        .map_err(|e| failed(0, e))?;

    let current: i64 = sqlx::query_scalar(dialect.current_migration())
        .fetch_one(pool)
        .await
        .map_err(|e| failed(0, e))?;

    for (version, sql) in MIGRATIONS {
        if *version > current {
            sqlx::query(sql(dialect))
                .execute(pool)
                .await
                .map_err(|e| failed(*version, e))?;
            sqlx::query(dialect.record_migration())
                .bind(*version)
                .bind(chrono::Utc::now().to_rfc3339())
                .execute(pool)
                .await
                .map_err(|e| failed(*version, e))?;
            tracing::debug!(version, dialect = dialect.name(), "applied cache migration");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().await.unwrap();
        run_sqlite(&conn).await.unwrap();
        run_sqlite(&conn).await.unwrap();

        let has_cache: bool = conn
            .call(|conn| {
                Ok(conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='cache')",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();

        assert!(has_cache);
    }

    #[tokio::test]
    async fn test_migrations_version_tracking() {
        let conn = Connection::open_in_memory().await.unwrap();
        run_sqlite(&conn).await.unwrap();

        let count: i64 = conn
            .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))?))
            .await
            .unwrap();

        assert_eq!(count, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn test_existing_cache_table_is_kept() {
        let conn = Connection::open_in_memory().await.unwrap();
        conn.call(|conn| {
            Ok(conn.execute_batch(
                "CREATE TABLE cache (`key` TEXT NOT NULL PRIMARY KEY, `value` BLOB);
                 INSERT INTO cache VALUES ('req:1', x'010203');",
            )?)
        })
        .await
        .unwrap();

        run_sqlite(&conn).await.unwrap();

        let rows: i64 = conn
            .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM cache", [], |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_rerun_after_lost_version_row() {
        let conn = Connection::open_in_memory().await.unwrap();
        run_sqlite(&conn).await.unwrap();
        conn.call(|conn| Ok(conn.execute_batch("DELETE FROM _migrations; INSERT INTO cache VALUES ('kept', x'01');")?))
            .await
            .unwrap();

        run_sqlite(&conn).await.unwrap();
        run_sqlite(&conn).await.unwrap();

        let (versions, rows): (i64, i64) = conn
            .call(|conn| {
                Ok(conn.query_row(
                    "SELECT (SELECT COUNT(*) FROM _migrations), (SELECT COUNT(*) FROM cache)",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(versions, MIGRATIONS.len() as i64);
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_version_recorded_by_another_process_is_kept() {
        let conn = Connection::open_in_memory().await.unwrap();
        run_sqlite(&conn).await.unwrap();

        // A second starter that read the version before the first one recorded it.
        let recorded = conn
            .call(|conn| {
                Ok(conn.execute(Dialect::Sqlite.record_migration(), params![1i64, "2024-01-01T00:00:00+00:00"])?)
            })
            .await
            .unwrap();
        assert_eq!(recorded, 0);

        let current: i64 = conn
            .call(|conn| Ok(conn.query_row(Dialect::Sqlite.current_migration(), [], |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(current, 1);
    }
}

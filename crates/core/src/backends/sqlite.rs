//! Embedded SQLite adapter.
//!
//! Opens the database file through tokio-rusqlite, which runs every
//! statement on a dedicated background thread, applies pragmas for
//! concurrent readers (WAL mode), and runs migrations.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_rusqlite::Connection;
use rusqlite::{self, params};

use crate::cache::{AllowFullTable, CacheEntry, Dialect, PayloadCodec, RecordStore, migrations};
use crate::compress::Compressor;
use crate::config::SqliteConfig;
use crate::error::{Error, StorageError};

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
                       PRAGMA synchronous=NORMAL;
                       PRAGMA temp_store=MEMORY;";

/// Cache backed by a single SQLite database file.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Connection,
    codec: PayloadCodec,
}

impl SqliteCache {
    /// Open the database at the configured path.
    ///
    /// Creates the file if it doesn't exist (an empty path means
    /// `predator-cache.sqlite`), applies pragmas, and runs any pending
    /// migrations. Compression starts disabled.
    pub async fn initialize(config: &SqliteConfig) -> Result<Self, Error> {
        let path = config.resolved_path();
        let conn = Connection::open(path).await.map_err(|e| Error::Connection(e.into()))?;
        tracing::debug!(path = %path.display(), "opened sqlite cache");
        Self::prepare(conn).await
    }

    /// Open a private in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().await.map_err(|e| Error::Connection(e.into()))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| Ok(conn.execute_batch(PRAGMAS)?))
            .await
            .map_err(|e| Error::Connection(e.into()))?;

        migrations::run_sqlite(&conn).await?;

        Ok(Self { conn, codec: PayloadCodec::default() })
    }

    /// Use `compressor` instead of the default zstd compressor.
    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.codec.replace_compressor(compressor);
        self
    }
}

#[async_trait]
impl RecordStore for SqliteCache {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn codec(&self) -> &PayloadCodec {
        &self.codec
    }

    async fn fetch(&self, key: &str) -> Result<Option<CacheEntry>, StorageError> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> tokio_rusqlite::Result<Option<CacheEntry>> {
                let mut stmt = conn.prepare_cached(Dialect::Sqlite.select_value())?;
                let result = stmt.query_row(params![key], |row| row.get::<_, Option<Vec<u8>>>(0));

                match result {
                    Ok(value) => Ok(Some(CacheEntry { key, value })),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(StorageError::from)
    }

    async fn count(&self, key: &str) -> Result<i64, StorageError> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> tokio_rusqlite::Result<i64> {
                let mut stmt = conn.prepare_cached(Dialect::Sqlite.count_key())?;
                Ok(stmt.query_row(params![key], |row| row.get(0))?)
            })
            .await
            .map_err(StorageError::from)
    }

    async fn insert(&self, entry: CacheEntry) -> Result<(), StorageError> {
        self.conn
            .call(move |conn| -> tokio_rusqlite::Result<()> {
                let mut stmt = conn.prepare_cached(Dialect::Sqlite.insert_if_absent())?;
                let written = stmt.execute(params![entry.key, entry.value])?;
                if written == 0 {
                    tracing::debug!(key = %entry.key, "entry stored concurrently, keeping first value");
                }
                Ok(())
            })
            .await
            .map_err(StorageError::from)
    }

    async fn delete_all(&self, allow: AllowFullTable) -> Result<u64, StorageError> {
        self.conn
            .call(move |conn| -> tokio_rusqlite::Result<u64> {
                let deleted = conn.execute(Dialect::Sqlite.delete_all(allow), [])?;
                Ok(deleted as u64)
            })
            .await
            .map_err(StorageError::from)
    }
}

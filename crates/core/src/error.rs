//! Unified error types for predator-cache.
//!
//! Write paths (`store`, `clear`) and startup return ordinary errors. Read-path
//! failures are split into their own fatal class so callers cannot mistake a
//! damaged cache for a miss.

use crate::config::ConfigError;
use rusqlite;

/// Failure raised by the storage engine driver.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// SQLite failure from the tokio-rusqlite worker.
    #[error("sqlite: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),

    /// MySQL or PostgreSQL failure from the sqlx pool.
    #[error("sql: {0}")]
    Sql(#[from] sqlx::Error),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Sqlite(tokio_rusqlite::Error::Rusqlite(err))
    }
}

/// Unified error type for cache operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Required configuration is missing or malformed.
    #[error("CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    /// The storage engine could not be reached.
    #[error("CONNECTION_ERROR: {0}")]
    Connection(#[source] StorageError),

    /// A schema migration failed to apply.
    #[error("CONNECTION_ERROR: migration {version} failed: {source}")]
    MigrationFailed { version: i64, source: StorageError },

    /// Existence check or insert failed.
    #[error("STORE_ERROR: {0}")]
    Store(#[source] StorageError),

    /// The compressor rejected a payload on the write path.
    #[error("STORE_ERROR: compression failed: {0}")]
    Compress(#[source] std::io::Error),

    /// Deleting all entries failed.
    #[error("CLEAR_ERROR: {0}")]
    Clear(#[source] StorageError),

    /// Storage failed while reading an entry. Fatal.
    #[error("LOOKUP_FAILED: {0}")]
    Lookup(#[source] StorageError),

    /// A stored payload could not be decompressed. Fatal.
    #[error("CACHE_CORRUPTED: entry {key}: {source}")]
    Corrupted { key: String, source: std::io::Error },
}

impl Error {
    /// Whether this error means the cache itself can no longer be trusted.
    ///
    /// Fatal errors come only from `lookup`. They must never be handled as a
    /// cache miss; the calling flow is expected to stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Lookup(_) | Error::Corrupted { .. })
    }
}

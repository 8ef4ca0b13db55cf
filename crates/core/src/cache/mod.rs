//! Backend-agnostic persistent cache.
//!
//! This module defines the cache contract shared by every storage adapter:
//!
//! - Grow-only `key → bytes` entries; a key is written at most once
//! - Optional payload compression, toggled per adapter
//! - Explicit full clear as the only invalidation
//!
//! Adapters only supply SQL execution through [`RecordStore`]; the contract
//! logic in this module is written once for all of them.

pub mod codec;
pub mod dialect;
pub mod entry;
pub mod hash;
pub mod migrations;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;

use crate::backends::{MySqlCache, PostgresCache, SqliteCache};
use crate::config::{BackendConfig, CacheConfig};
use crate::error::{Error, StorageError};

pub use codec::PayloadCodec;
pub use dialect::Dialect;
pub use entry::CacheEntry;
pub use hash::request_key;

/// Permission to run a statement that touches every row of the cache table.
///
/// Relational engines guard against unscoped deletes; the cache only issues
/// one when the caller hands over this value explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowFullTable;

/// The cache contract.
///
/// Initialization is each adapter's async constructor, so every method here
/// runs against a live, migrated store.
#[async_trait]
pub trait Cache: Send + Sync + std::fmt::Debug {
    /// Look up the payload stored under `key`.
    ///
    /// Returns `Ok(None)` on a miss. Errors from this method are always fatal
    /// (see [`Error::is_fatal`]): either the engine failed or the stored
    /// payload could not be decompressed.
    async fn lookup(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Store `value` under `key` unless the key is already present.
    ///
    /// An existing entry is never compared or replaced.
    async fn store(&self, key: &str, value: &[u8]) -> Result<(), Error>;

    /// Delete every entry, returning how many were removed.
    async fn clear(&self, allow: AllowFullTable) -> Result<u64, Error>;

    /// Enable or disable compression for subsequent `store` and `lookup`
    /// calls. Entries already stored are not rewritten.
    fn set_compression(&self, enabled: bool);

    /// Whether payloads are currently compressed on write and decompressed on read.
    fn is_compressed(&self) -> bool;
}

/// Raw row access implemented by each storage adapter.
///
/// Payloads pass through untouched; compression happens above this layer.
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Engine this store talks to.
    fn dialect(&self) -> Dialect;

    /// Compression state shared by every call on this store.
    fn codec(&self) -> &PayloadCodec;

    /// Read the row stored under `key`, if any.
    async fn fetch(&self, key: &str) -> Result<Option<CacheEntry>, StorageError>;

    /// Number of rows stored under `key` (0 or 1).
    async fn count(&self, key: &str) -> Result<i64, StorageError>;

    /// Insert the entry unless its key exists. An existing row is left untouched
    /// and is not an error.
    async fn insert(&self, entry: CacheEntry) -> Result<(), StorageError>;

    /// Delete every row, returning how many were removed.
    async fn delete_all(&self, allow: AllowFullTable) -> Result<u64, StorageError>;
}

#[async_trait]
impl<S: RecordStore> Cache for S {
    async fn lookup(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let entry = self.fetch(key).await.map_err(|e| {
            tracing::error!(key, backend = self.dialect().name(), error = %e, "cache lookup failed");
            Error::Lookup(e)
        })?;

        match entry.and_then(|entry| entry.value) {
            Some(stored) => self.codec().decode(key, stored).map(Some),
            None => {
                tracing::debug!(key, "cache miss");
                Ok(None)
            }
        }
    }

    async fn store(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        // Counting avoids reading and decompressing a possibly large payload.
        if self.count(key).await.map_err(Error::Store)? > 0 {
            tracing::debug!(key, "entry already cached, skipping store");
            return Ok(());
        }

        let payload = self.codec().encode(value)?;
        self.insert(CacheEntry::new(key, payload)).await.map_err(Error::Store)
    }

    async fn clear(&self, allow: AllowFullTable) -> Result<u64, Error> {
        let deleted = self.delete_all(allow).await.map_err(Error::Clear)?;
        tracing::debug!(deleted, backend = self.dialect().name(), "cache cleared");
        Ok(deleted)
    }

    fn set_compression(&self, enabled: bool) {
        self.codec().set_enabled(enabled);
    }

    fn is_compressed(&self) -> bool {
        self.codec().is_enabled()
    }
}

/// Build the adapter selected by `config`, ready for use.
///
/// Validates the configuration, connects, runs migrations, installs the
/// configured compressor and applies the initial compression flag.
///
/// # Errors
///
/// Returns `Error::Config` for invalid settings, `Error::Connection` or
/// `Error::MigrationFailed` when the engine cannot be prepared.
pub async fn open(config: &CacheConfig) -> Result<Arc<dyn Cache>, Error> {
    config.validate()?;
    let compressor = config.compression.compressor();

    let cache: Arc<dyn Cache> = match &config.backend {
        BackendConfig::Sqlite(sqlite) => Arc::new(SqliteCache::initialize(sqlite).await?.with_compressor(compressor)),
        BackendConfig::Mysql(mysql) => Arc::new(MySqlCache::initialize(mysql).await?.with_compressor(compressor)),
        BackendConfig::Postgres(postgres) => {
            Arc::new(PostgresCache::initialize(postgres).await?.with_compressor(compressor))
        }
    };
    cache.set_compression(config.compressed);

    tracing::info!(
        backend = config.backend.kind(),
        compressed = config.compressed,
        compression = ?config.compression,
        "cache ready"
    );
    Ok(cache)
}

//! Persistent request/response cache for predator scrapers.
//!
//! This crate provides:
//! - The `Cache` contract with SQLite, MySQL and PostgreSQL adapters
//! - Optional payload compression (zstd, lz4)
//! - Unified error types
//! - Configuration structures

pub mod backends;
pub mod cache;
pub mod compress;
pub mod config;
pub mod error;

pub use backends::{MySqlCache, PostgresCache, SqliteCache};
pub use cache::{AllowFullTable, Cache, CacheEntry, open, request_key};
pub use compress::{CompressionAlgorithm, Compressor};
pub use config::{BackendConfig, CacheConfig, ConfigError};
pub use error::Error;

//! Storage adapters, one per engine.

pub mod mysql;
pub mod postgres;
pub mod sqlite;

mod pooled;

pub use mysql::MySqlCache;
pub use postgres::PostgresCache;
pub use sqlite::SqliteCache;

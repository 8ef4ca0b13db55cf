//! Cache configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PREDATOR_CACHE_*)
//! 2. TOML config file (if PREDATOR_CACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::compress::CompressionAlgorithm;

mod validation;

pub use validation::ConfigError;

/// File used by the SQLite adapter when no path is configured.
pub const DEFAULT_SQLITE_PATH: &str = "predator-cache.sqlite";

/// Environment variable prefix for every configuration key.
pub const ENV_PREFIX: &str = "PREDATOR_CACHE_";

/// Environment variable naming an optional TOML config file.
pub const CONFIG_FILE_ENV: &str = "PREDATOR_CACHE_CONFIG_FILE";

/// Top-level cache configuration.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PREDATOR_CACHE_*, nested with `__`)
/// 2. TOML config file
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether payloads are compressed on store and decompressed on lookup.
    ///
    /// Set via PREDATOR_CACHE_COMPRESSED environment variable.
    #[serde(default)]
    pub compressed: bool,

    /// Algorithm used when `compressed` is set.
    ///
    /// Set via PREDATOR_CACHE_COMPRESSION environment variable.
    #[serde(default)]
    pub compression: CompressionAlgorithm,

    /// Storage engine and its connection settings.
    ///
    /// Set via PREDATOR_CACHE_BACKEND__KIND and PREDATOR_CACHE_BACKEND__* variables.
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Storage engine selection. Exactly one adapter is built per cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    Sqlite(SqliteConfig),
    Mysql(MySqlConfig),
    Postgres(PostgresConfig),
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Sqlite(SqliteConfig::default())
    }
}

impl BackendConfig {
    /// Short engine name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendConfig::Sqlite(_) => "sqlite",
            BackendConfig::Mysql(_) => "mysql",
            BackendConfig::Postgres(_) => "postgres",
        }
    }
}

/// Embedded SQLite settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Database file. An empty path falls back to [`DEFAULT_SQLITE_PATH`];
    /// `:memory:` opens a private in-memory database.
    #[serde(default = "default_sqlite_path")]
    pub path: PathBuf,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self { path: default_sqlite_path() }
    }
}

impl SqliteConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path actually opened.
    pub fn resolved_path(&self) -> &Path {
        if self.path.as_os_str().is_empty() { Path::new(DEFAULT_SQLITE_PATH) } else { &self.path }
    }
}

/// MySQL server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MySqlConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_mysql_port(),
            database: String::new(),
            username: String::new(),
            password: String::new(),
        }
    }
}

/// PostgreSQL server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_postgres_port")]
    pub port: u16,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,

    /// libpq-style SSL mode. Empty means `disable`.
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,

    /// Session time zone. Empty means `Asia/Shanghai`.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_postgres_port(),
            database: String::new(),
            username: String::new(),
            password: String::new(),
            ssl_mode: default_ssl_mode(),
            time_zone: default_time_zone(),
        }
    }
}

impl PostgresConfig {
    pub fn effective_ssl_mode(&self) -> &str {
        if self.ssl_mode.is_empty() { DEFAULT_SSL_MODE } else { &self.ssl_mode }
    }

    pub fn effective_time_zone(&self) -> &str {
        if self.time_zone.is_empty() { DEFAULT_TIME_ZONE } else { &self.time_zone }
    }
}

const DEFAULT_SSL_MODE: &str = "disable";
const DEFAULT_TIME_ZONE: &str = "Asia/Shanghai";

fn default_sqlite_path() -> PathBuf {
    PathBuf::from(DEFAULT_SQLITE_PATH)
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_ssl_mode() -> String {
    DEFAULT_SSL_MODE.into()
}

fn default_time_zone() -> String {
    DEFAULT_TIME_ZONE.into()
}

impl CacheConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// The TOML file is taken from `PREDATOR_CACHE_CONFIG_FILE` when set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);
        Self::load_with_file(file.as_deref())
    }

    /// Same as [`CacheConfig::load`] with an explicit TOML file.
    pub fn load_with_file(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert!(!config.compressed);
        assert_eq!(config.compression, CompressionAlgorithm::Zstd);
        assert_eq!(config.backend, BackendConfig::Sqlite(SqliteConfig::new("predator-cache.sqlite")));
        assert_eq!(config.backend.kind(), "sqlite");
    }

    #[test]
    fn test_sqlite_empty_path_falls_back() {
        let config = SqliteConfig::new("");
        assert_eq!(config.resolved_path(), Path::new(DEFAULT_SQLITE_PATH));

        let config = SqliteConfig::new("/tmp/pages.sqlite");
        assert_eq!(config.resolved_path(), Path::new("/tmp/pages.sqlite"));
    }

    #[test]
    fn test_postgres_defaults() {
        let config = PostgresConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.effective_ssl_mode(), "disable");
        assert_eq!(config.effective_time_zone(), "Asia/Shanghai");

        let blank = PostgresConfig { ssl_mode: String::new(), time_zone: String::new(), ..Default::default() };
        assert_eq!(blank.effective_ssl_mode(), "disable");
        assert_eq!(blank.effective_time_zone(), "Asia/Shanghai");
    }

    #[test]
    fn test_mysql_default_port() {
        assert_eq!(MySqlConfig::default().port, 3306);
    }

    #[test]
    fn test_load_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = CacheConfig::load_with_file(None).map_err(|e| e.to_string())?;
            assert_eq!(config.backend.kind(), "sqlite");
            assert!(!config.compressed);
            Ok(())
        });
    }

    #[test]
    fn test_load_postgres_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PREDATOR_CACHE_COMPRESSED", "true");
            jail.set_env("PREDATOR_CACHE_COMPRESSION", "lz4");
            jail.set_env("PREDATOR_CACHE_BACKEND__KIND", "postgres");
            jail.set_env("PREDATOR_CACHE_BACKEND__HOST", "db.internal");
            jail.set_env("PREDATOR_CACHE_BACKEND__DATABASE", "crawler");
            jail.set_env("PREDATOR_CACHE_BACKEND__USERNAME", "spider");

            let config = CacheConfig::load_with_file(None).map_err(|e| e.to_string())?;
            assert!(config.compressed);
            assert_eq!(config.compression, CompressionAlgorithm::Lz4);
            match config.backend {
                BackendConfig::Postgres(pg) => {
                    assert_eq!(pg.host, "db.internal");
                    assert_eq!(pg.database, "crawler");
                    assert_eq!(pg.port, 5432);
                    assert_eq!(pg.effective_ssl_mode(), "disable");
                }
                other => panic!("expected postgres backend, got {other:?}"),
            }
            Ok(())
        });
    }

    #[test]
    fn test_load_toml_file_then_env_override() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "cache.toml",
                r#"
                compressed = false

                [backend]
                kind = "mysql"
                host = "mysql.local"
                port = 3307
                database = "pages"
                username = "root"
                "#,
            )?;
            jail.set_env("PREDATOR_CACHE_BACKEND__HOST", "mysql.override");

            let config = CacheConfig::load_with_file(Some(Path::new("cache.toml"))).map_err(|e| e.to_string())?;
            match config.backend {
                BackendConfig::Mysql(my) => {
                    assert_eq!(my.host, "mysql.override");
                    assert_eq!(my.port, 3307);
                    assert_eq!(my.database, "pages");
                }
                other => panic!("expected mysql backend, got {other:?}"),
            }
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_incomplete_backend() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PREDATOR_CACHE_BACKEND__KIND", "mysql");

            let result = CacheConfig::load_with_file(None);
            assert!(matches!(result, Err(ConfigError::Missing { .. })));
            Ok(())
        });
    }
}

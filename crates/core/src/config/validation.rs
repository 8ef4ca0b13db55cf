//! Configuration validation rules.
//!
//! This module provides validation logic for `CacheConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{BackendConfig, CacheConfig, MySqlConfig, PostgresConfig};
use thiserror::Error;

/// SSL modes understood by PostgreSQL clients.
const SSL_MODES: &[&str] = &["disable", "allow", "prefer", "require", "verify-ca", "verify-full"];

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl CacheConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if a networked backend has no host,
    /// database or username, and `ConfigError::Invalid` if its port is 0 or
    /// the PostgreSQL SSL mode is unknown.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.backend {
            BackendConfig::Sqlite(_) => Ok(()),
            BackendConfig::Mysql(mysql) => mysql.validate(),
            BackendConfig::Postgres(postgres) => postgres.validate(),
        }
    }
}

impl MySqlConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_server_fields(&self.host, self.port, &self.database, &self.username)
    }
}

impl PostgresConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_server_fields(&self.host, self.port, &self.database, &self.username)?;

        let ssl_mode = self.effective_ssl_mode();
        if !SSL_MODES.contains(&ssl_mode) {
            return Err(ConfigError::Invalid {
                field: "backend.ssl_mode".into(),
                reason: format!("unknown mode '{ssl_mode}', expected one of {}", SSL_MODES.join(", ")),
            });
        }

        if ssl_mode == "disable" && !self.password.is_empty() {
            tracing::warn!(host = %self.host, "PostgreSQL password will be sent without TLS (ssl_mode = disable)");
        }

        Ok(())
    }
}

fn require_server_fields(host: &str, port: u16, database: &str, username: &str) -> Result<(), ConfigError> {
    if host.trim().is_empty() {
        return Err(ConfigError::Missing {
            field: "backend.host".into(),
            hint: "Set PREDATOR_CACHE_BACKEND__HOST environment variable".into(),
        });
    }
    if port == 0 {
        return Err(ConfigError::Invalid { field: "backend.port".into(), reason: "must be greater than 0".into() });
    }
    if database.trim().is_empty() {
        return Err(ConfigError::Missing {
            field: "backend.database".into(),
            hint: "Set PREDATOR_CACHE_BACKEND__DATABASE environment variable".into(),
        });
    }
    if username.is_empty() {
        return Err(ConfigError::Missing {
            field: "backend.username".into(),
            hint: "Set PREDATOR_CACHE_BACKEND__USERNAME environment variable".into(),
        });
    }
    Ok(())
}

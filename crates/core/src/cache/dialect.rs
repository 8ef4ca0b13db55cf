//! Per-engine SQL text for the cache table.
//!
//! The statements are identical across engines except for placeholder syntax
//! and identifier quoting: SQLite and MySQL quote `key` and `value` with
//! backticks, PostgreSQL leaves them bare.

use super::AllowFullTable;

/// SQL flavour spoken by a storage engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    MySql,
    Postgres,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
        }
    }

    /// Schema for the `cache` table. Safe to run against an existing table.
    pub fn create_cache_table(self) -> &'static str {
        match self {
            Dialect::Sqlite => "CREATE TABLE IF NOT EXISTS cache (`key` TEXT NOT NULL PRIMARY KEY, `value` BLOB)",
            Dialect::MySql => {
                "CREATE TABLE IF NOT EXISTS cache (`key` VARCHAR(255) NOT NULL PRIMARY KEY, `value` LONGBLOB) \
                 DEFAULT CHARSET = utf8mb4"
            }
            Dialect::Postgres => "CREATE TABLE IF NOT EXISTS cache (key TEXT NOT NULL PRIMARY KEY, value BYTEA)",
        }
    }

    pub fn create_migrations_table(self) -> &'static str {
        match self {
            Dialect::Sqlite => {
                "CREATE TABLE IF NOT EXISTS _migrations (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL)"
            }
            Dialect::MySql | Dialect::Postgres => {
                "CREATE TABLE IF NOT EXISTS _migrations (version BIGINT NOT NULL PRIMARY KEY, applied_at VARCHAR(64) NOT NULL)"
            }
        }
    }

    pub fn current_migration(self) -> &'static str {
        "SELECT COALESCE(MAX(version), 0) FROM _migrations"
    }

    /// Mark a version applied. A version already recorded by another process
    /// is left as is.
    pub fn record_migration(self) -> &'static str {
        match self {
            Dialect::Sqlite => {
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2) ON CONFLICT(version) DO NOTHING"
            }
            Dialect::MySql => {
                "INSERT INTO _migrations (version, applied_at) VALUES (?, ?) ON DUPLICATE KEY UPDATE version = version"
            }
            Dialect::Postgres => {
                "INSERT INTO _migrations (version, applied_at) VALUES ($1, $2) ON CONFLICT (version) DO NOTHING"
            }
        }
    }

    /// Fetch the payload for one key.
    pub fn select_value(self) -> &'static str {
        match self {
            Dialect::Sqlite => "SELECT `value` FROM cache WHERE `key` = ?1 LIMIT 1",
            Dialect::MySql => "SELECT `value` FROM cache WHERE `key` = ? LIMIT 1",
            Dialect::Postgres => "SELECT value FROM cache WHERE key = $1 LIMIT 1",
        }
    }

    /// Existence check used before insert. Does not read the payload.
    pub fn count_key(self) -> &'static str {
        match self {
            Dialect::Sqlite => "SELECT COUNT(*) FROM cache WHERE `key` = ?1",
            Dialect::MySql => "SELECT COUNT(*) FROM cache WHERE `key` = ?",
            Dialect::Postgres => "SELECT COUNT(*) FROM cache WHERE key = $1",
        }
    }

    /// Insert that leaves an existing row untouched.
    ///
    /// The affected-row count cannot tell a write from a skip on MySQL, where
    /// the driver reports found rows, so callers only learn that the key is now
    /// present.
    pub fn insert_if_absent(self) -> &'static str {
        match self {
            Dialect::Sqlite => "INSERT INTO cache (`key`, `value`) VALUES (?1, ?2) ON CONFLICT(`key`) DO NOTHING",
            Dialect::MySql => {
                "INSERT INTO cache (`key`, `value`) VALUES (?, ?) ON DUPLICATE KEY UPDATE `key` = `key`"
            }
            Dialect::Postgres => "INSERT INTO cache (key, value) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING",
        }
    }

    /// Unscoped delete. Only reachable with an [`AllowFullTable`] token.
    pub fn delete_all(self, _allow: AllowFullTable) -> &'static str {
        "DELETE FROM cache"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Dialect; 3] = [Dialect::Sqlite, Dialect::MySql, Dialect::Postgres];

    fn statements(dialect: Dialect) -> [&'static str; 5] {
        [
            dialect.create_cache_table(),
            dialect.select_value(),
            dialect.count_key(),
            dialect.insert_if_absent(),
            dialect.delete_all(AllowFullTable),
        ]
    }

    #[test]
    fn test_every_statement_targets_cache_table() {
        for dialect in ALL {
            for sql in statements(dialect) {
                assert!(sql.contains(" cache"), "{}: {sql}", dialect.name());
            }
        }
    }

    #[test]
    fn test_key_column_quoting() {
        assert!(Dialect::Sqlite.select_value().contains("`key` = ?1"));
        assert!(Dialect::MySql.select_value().contains("`key` = ?"));
        assert!(Dialect::Postgres.select_value().contains("key = $1"));
        assert!(!Dialect::Postgres.select_value().contains('`'));
        assert!(!Dialect::Postgres.create_cache_table().contains('`'));
    }

    #[test]
    fn test_insert_never_overwrites() {
        for dialect in ALL {
            let sql = dialect.insert_if_absent();
            assert!(!sql.contains("excluded"), "{}: {sql}", dialect.name());
            assert!(sql.contains("DO NOTHING") || sql.contains("`key` = `key`"), "{}: {sql}", dialect.name());
        }
    }

    #[test]
    fn test_duplicate_key_is_a_noop_update() {
        assert!(Dialect::MySql.insert_if_absent().ends_with("ON DUPLICATE KEY UPDATE `key` = `key`"));
        assert!(!Dialect::MySql.insert_if_absent().contains("IGNORE"));
        assert!(Dialect::Sqlite.insert_if_absent().ends_with("DO NOTHING"));
        assert!(Dialect::Postgres.insert_if_absent().ends_with("DO NOTHING"));
    }

    #[test]
    fn test_record_migration_tolerates_applied_version() {
        assert!(Dialect::Sqlite.record_migration().ends_with("ON CONFLICT(version) DO NOTHING"));
        assert!(Dialect::MySql.record_migration().ends_with("ON DUPLICATE KEY UPDATE version = version"));
        assert!(Dialect::Postgres.record_migration().ends_with("ON CONFLICT (version) DO NOTHING"));
    }

    #[test]
    fn test_value_column_is_nullable_blob() {
        assert!(Dialect::Sqlite.create_cache_table().contains("`value` BLOB)"));
        assert!(Dialect::MySql.create_cache_table().contains("`value` LONGBLOB)"));
        assert!(Dialect::Postgres.create_cache_table().contains("value BYTEA)"));
    }
}

//! `SQLite` connection pool and configuration.
//!
//! `SQLite` is the single persistent store. It holds the live `person`
//! table, the append-only `person_archive` table, and the `id_sequence`
//! high-water mark, and gives us all-or-nothing commits across them.
//!
//! Uses [`sqlx`] with runtime query construction (not compile-time checked)
//! to avoid requiring a live database at build time. All queries are
//! parameterized to prevent SQL injection.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::error::StoreError;

/// Default maximum number of connections in the pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 8;

/// Default connection timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default idle timeout in seconds.
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Default time a connection waits on a locked database, in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// URL of a private in-memory database.
const IN_MEMORY_URL: &str = "sqlite::memory:";

/// Configuration for the `SQLite` connection pool.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL.
    ///
    /// Format: `sqlite://path/to/strata.db` or `sqlite::memory:`
    pub url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Idle connection timeout. `None` keeps idle connections forever.
    pub idle_timeout: Option<Duration>,
    /// How long a statement waits on a locked database before failing
    /// with `SQLITE_BUSY`.
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    /// Create a new configuration from a database URL.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            idle_timeout: Some(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS)),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }

    /// A private in-memory database on a single pinned connection.
    ///
    /// Every `SQLite` connection to `:memory:` opens a fresh database, so
    /// the pool is held at exactly one connection that never expires.
    pub fn in_memory() -> Self {
        Self {
            max_connections: 1,
            idle_timeout: None,
            ..Self::new(IN_MEMORY_URL)
        }
    }

    /// Whether the URL names an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub const fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the lock wait timeout.
    #[must_use]
    pub const fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

/// Connection pool handle to `SQLite`.
///
/// Wraps a [`sqlx::SqlitePool`] and provides access to the person store,
/// history log, and version coordinator.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to `SQLite` using the provided configuration.
    ///
    /// File databases are created if missing and run in WAL mode with
    /// `synchronous = FULL`, so a commit survives a process crash.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection fails.
    /// Returns [`StoreError::Config`] if the URL cannot be parsed.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let in_memory = config.is_in_memory();

        let mut connect_options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| StoreError::Config(format!("Invalid database URL: {e}")))?
            .create_if_missing(true)
            .busy_timeout(config.busy_timeout);

        if !in_memory {
            connect_options = connect_options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Full);
        }

        let max_connections = if in_memory { 1 } else { config.max_connections };

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout);

        if in_memory {
            pool_options = pool_options.min_connections(1).max_lifetime(None);
        }

        let pool = pool_options.connect_with(connect_options).await?;

        tracing::info!(max_connections, in_memory, "Connected to SQLite");

        Ok(Self { pool })
    }

    /// Connect using a database URL string with default pool settings.
    ///
    /// Convenience wrapper around [`Database::connect`] with
    /// [`DatabaseConfig::new`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection fails.
    pub async fn connect_url(url: &str) -> Result<Self, StoreError> {
        let config = DatabaseConfig::new(url);
        Self::connect(&config).await
    }

    /// Run all pending migrations from the `migrations/` directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Migration`] if any migration fails.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations completed");
        Ok(())
    }

    /// Return a reference to the underlying [`SqlitePool`].
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all connections in the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("SQLite pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_config_pins_one_connection() {
        let config = DatabaseConfig::in_memory();
        assert!(config.is_in_memory());
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.idle_timeout, None);
    }

    #[test]
    fn file_url_is_not_in_memory() {
        let config = DatabaseConfig::new("sqlite://strata.db").with_max_connections(4);
        assert!(!config.is_in_memory());
        assert_eq!(config.max_connections, 4);
    }

    #[test]
    fn builders_override_defaults() {
        let config = DatabaseConfig::new("sqlite://strata.db")
            .with_busy_timeout(Duration::from_millis(250))
            .with_idle_timeout(None);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.idle_timeout, None);
    }
}

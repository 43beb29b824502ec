//! Configuration loading and typed config structures for the server.
//!
//! The configuration lives in `strata-config.yaml` (or the file named by
//! `STRATA_CONFIG`). Every field has a default, so a missing file or a
//! partial one is fine. After parsing, a few environment variables
//! override the file:
//!
//! - `DATABASE_URL` overrides `database.url`
//! - `STRATA_HOST` overrides `server.host`
//! - `STRATA_PORT` overrides `server.port`
//! - `STRATA_LOG_LEVEL` overrides `logging.level`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use strata_api::ServerConfig;
use strata_db::{DatabaseConfig, RetryPolicy};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "STRATA_CONFIG";

/// Config file used when `STRATA_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "strata-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidEnv {
        /// The variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration, mirroring `strata-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StrataConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseSettings,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Log level and output format.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Write-conflict retry settings.
    #[serde(default)]
    pub retry: RetrySettings,
}

impl StrataConfig {
    /// Parse configuration from a YAML string. No env overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Load configuration from a YAML file. No env overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load from `path` if it exists (defaults otherwise), then apply env
    /// overrides read through `lookup`.
    ///
    /// Returns the config and whether the file was found.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file exists but cannot be read or
    /// parsed, or if an override is malformed.
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<(Self, bool), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let found = path.exists();
        let mut config = if found {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides_from(lookup)?;
        Ok((config, found))
    }

    /// Load using the process environment for the path and overrides.
    ///
    /// # Errors
    ///
    /// See [`StrataConfig::load_with`].
    pub fn load() -> Result<(Self, bool), ConfigError> {
        let lookup = |name: &str| std::env::var(name).ok();
        let path = config_path(lookup);
        Self::load_with(&path, lookup)
    }

    /// Override file values with environment variables when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if `STRATA_PORT` is not a port
    /// number.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = lookup("STRATA_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("STRATA_PORT") {
            self.server.port = val.parse().map_err(|e| ConfigError::InvalidEnv {
                name: "STRATA_PORT",
                value: val.clone(),
                reason: format!("{e}"),
            })?;
        }
        if let Some(val) = lookup("STRATA_LOG_LEVEL") {
            self.logging.level = val;
        }
        Ok(())
    }

    /// Pool settings for [`strata_db::Database::connect`].
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(&self.database.url)
            .with_max_connections(self.database.max_connections)
            .with_connect_timeout(Duration::from_millis(self.database.connect_timeout_ms))
            .with_busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }

    /// Listener settings for [`strata_api::start_server`].
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
        }
    }

    /// Retry policy for the person service.
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }
}

/// The config file path: `STRATA_CONFIG` if set, else the default.
pub fn config_path<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup(CONFIG_PATH_ENV).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseSettings {
    /// `SQLite` URL, e.g. `sqlite://strata.db`.
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Lock wait in milliseconds before `SQLITE_BUSY`.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout_ms: default_connect_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Write-conflict retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetrySettings {
    /// Attempts per mutation, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first conflict, in milliseconds. Grows linearly.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_database_url() -> String {
    String::from("sqlite://strata.db")
}

const fn default_max_connections() -> u32 {
    8
}

const fn default_connect_timeout_ms() -> u64 {
    5_000
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_max_attempts() -> u32 {
    8
}

const fn default_base_delay_ms() -> u64 {
    5
}

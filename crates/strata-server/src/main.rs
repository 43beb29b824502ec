//! `strata` server binary.
//!
//! Loads configuration, opens the `SQLite` store, applies migrations and
//! serves the person API until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `strata-config.yaml` (or `STRATA_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Connect the `SQLite` pool
//! 4. Run embedded migrations
//! 5. Serve HTTP until shutdown
//! 6. Close the pool

mod config;
mod error;

use std::sync::Arc;

use strata_api::AppState;
use strata_db::{Database, PersonService};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig, StrataConfig};
use crate::error::ServerError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, database setup, or serving fails.
#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // 1. Load configuration. Logging depends on it, so nothing is logged yet.
    let (config, found) = StrataConfig::load()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("strata starting");
    if !found {
        info!("Config file not found, using defaults");
    }
    info!(
        database_url = %config.database.url,
        host = %config.server.host,
        port = config.server.port,
        max_attempts = config.retry.max_attempts,
        "Configuration loaded"
    );

    // 3. Connect the pool.
    let database = Database::connect(&config.database_config()).await?;

    // 4. Apply migrations.
    database.run_migrations().await?;

    // 5. Serve until Ctrl-C.
    let service = PersonService::new(&database).with_retry_policy(config.retry_policy());
    let state = Arc::new(AppState::new(service));
    let served = strata_api::start_server(&config.server_config(), state).await;

    // 6. Close the pool even if serving failed.
    database.close().await;
    served?;

    info!("strata stopped");
    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

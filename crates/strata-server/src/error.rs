//! Error types for the server binary.
//!
//! [`ServerError`] is the top-level error that wraps every failure mode
//! during startup and serving, so `main` can propagate with `?`.

use crate::config::ConfigError;

/// Top-level error for the `strata` binary.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// Opening or migrating the database failed.
    #[error("database error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: strata_db::StoreError,
    },

    /// Binding or serving HTTP failed.
    #[error("http error: {source}")]
    Http {
        /// The underlying server error.
        #[from]
        source: strata_api::ServerError,
    },
}

//! HTTP boundary for the Strata versioned person store.
//!
//! This crate exposes the [`PersonService`](strata_db::PersonService)
//! operations as a small REST API over Axum:
//!
//! - **`/persons`** to list and create persons
//! - **`/persons/{id}`** to read, replace, patch and delete one person
//! - **`/persons/{id}/{version}`** to read any archived version
//!
//! Entity-shaped responses carry `id`, the five mutable fields and
//! `version`. Errors are JSON bodies of the form
//! `{"error": "...", "status": 404}`.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, serve, start_server};
pub use state::AppState;

//! Shared application state for the HTTP handlers.

use strata_db::PersonService;

/// State shared by every handler.
///
/// Cloning a [`PersonService`] only clones the pool handle, so the router
/// keeps one instance behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The store operations.
    pub service: PersonService,
}

impl AppState {
    /// Wrap a service for the router.
    pub const fn new(service: PersonService) -> Self {
        Self { service }
    }
}

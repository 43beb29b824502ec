//! Axum router construction.
//!
//! Assembles the person routes into a single [`Router`] with CORS and
//! request tracing middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete router.
///
/// The router includes:
/// - `GET /persons` and `POST /persons`
/// - `GET`, `PUT`, `PATCH` and `DELETE` on `/persons/{id}`
/// - `GET /persons/{id}/{version}`
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/persons",
            get(handlers::list_persons).post(handlers::create_person),
        )
        .route(
            "/persons/{id}",
            get(handlers::get_person)
                .put(handlers::put_person)
                .patch(handlers::patch_person)
                .delete(handlers::delete_person),
        )
        .route("/persons/{id}/{version}", get(handlers::get_person_version))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

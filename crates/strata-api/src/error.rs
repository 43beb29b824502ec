//! Error types for the HTTP boundary.
//!
//! [`ApiError`] unifies every failure a handler can hit into a single enum
//! that converts into an Axum response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Store
//! errors are mapped by [`StoreError::kind`], so the status code only
//! depends on the failure kind and never on the backend detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use strata_db::{ErrorKind, StoreError};
use strata_types::ValidationError;

/// Errors that can occur in the request-handling layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A path segment named no record.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request body is not valid JSON.
    #[error("malformed request body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    /// The request body failed field validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The store rejected or failed the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// The HTTP status this error is reported with.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MalformedBody(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Store(err) => match err.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed in the store");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

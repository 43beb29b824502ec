//! REST endpoint handlers.
//!
//! Handlers parse the path and body, hand the typed request to the
//! [`PersonService`](strata_db::PersonService) in [`AppState`], and shape
//! the reply. Bodies are read as raw bytes and parsed here so a malformed
//! or mistyped body is always a 400, regardless of `Content-Type`.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/persons` | List live persons |
//! | `POST` | `/persons` | Create a person |
//! | `GET` | `/persons/{id}` | Current state |
//! | `GET` | `/persons/{id}/{version}` | State as of a version |
//! | `PUT` | `/persons/{id}` | Replace every field |
//! | `PATCH` | `/persons/{id}` | Change the named fields |
//! | `DELETE` | `/persons/{id}` | Delete, keeping history |

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::Value;
use strata_types::{Person, PersonFields, PersonId, PersonPatch, Version};

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /persons
// ---------------------------------------------------------------------------

/// List every live person, ascending by id.
pub async fn list_persons(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Person>>, ApiError> {
    Ok(Json(state.service.read_all().await?))
}

// ---------------------------------------------------------------------------
// POST /persons
// ---------------------------------------------------------------------------

/// Create a person from a body carrying every required field.
///
/// Responds `201 {"id": n}`.
pub async fn create_person(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let fields = PersonFields::from_json(&parse_body(&body)?)?;
    let id = state.service.create(&fields).await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

// ---------------------------------------------------------------------------
// GET /persons/{id}
// ---------------------------------------------------------------------------

/// Current state of one person.
pub async fn get_person(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<Person>, ApiError> {
    let id = parse_person_id(&id_str)?;
    Ok(Json(state.service.read(id).await?))
}

// ---------------------------------------------------------------------------
// GET /persons/{id}/{version}
// ---------------------------------------------------------------------------

/// State of one person as of a version, shaped like a live record.
pub async fn get_person_version(
    State(state): State<Arc<AppState>>,
    Path((id_str, version_str)): Path<(String, String)>,
) -> Result<Json<Person>, ApiError> {
    let id = parse_person_id(&id_str)?;
    let version = version_str
        .parse::<Version>()
        .map_err(|e| ApiError::NotFound(format!("version {version_str}: {e}")))?;

    Ok(Json(state.service.read_version(id, version).await?))
}

// ---------------------------------------------------------------------------
// PUT /persons/{id}
// ---------------------------------------------------------------------------

/// Replace every field of a person. Missing required fields are a 400.
pub async fn put_person(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let id = parse_person_id(&id_str)?;
    let fields = PersonFields::from_json(&parse_body(&body)?)?;
    state.service.overwrite(id, &fields).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// PATCH /persons/{id}
// ---------------------------------------------------------------------------

/// Change only the fields named in the body. Unknown keys are ignored.
pub async fn patch_person(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let id = parse_person_id(&id_str)?;
    let patch = PersonPatch::from_json(&parse_body(&body)?)?;
    state.service.update(id, &patch).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// DELETE /persons/{id}
// ---------------------------------------------------------------------------

/// Delete the live record. Its history stays readable.
pub async fn delete_person(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_person_id(&id_str)?;
    state.service.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A path segment that is not an integer cannot name a person.
fn parse_person_id(s: &str) -> Result<PersonId, ApiError> {
    s.parse::<PersonId>()
        .map_err(|e| ApiError::NotFound(format!("person {s}: {e}")))
}

fn parse_body(body: &[u8]) -> Result<Value, ApiError> {
    Ok(serde_json::from_slice(body)?)
}

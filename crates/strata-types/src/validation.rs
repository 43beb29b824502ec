//! Field allow-lists and validation of caller-supplied field sets.
//!
//! Full writes (create and overwrite) must name every field in
//! [`REQUIRED_FIELDS`]. Partial updates may name any subset of
//! [`MUTABLE_FIELDS`]; keys outside that list are dropped, not rejected.

use serde_json::{Map, Value};

/// Fields a create or overwrite request must supply.
pub const REQUIRED_FIELDS: [&str; 4] = ["first_name", "last_name", "email", "age"];

/// Fields a partial update is allowed to touch. Anything else is ignored.
pub const MUTABLE_FIELDS: [&str; 5] = ["first_name", "middle_name", "last_name", "email", "age"];

/// A caller-supplied field set that cannot become a valid person.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The payload was not a JSON object.
    #[error("request body must be a JSON object")]
    NotAnObject,

    /// One or more required fields were absent.
    #[error("missing_required_fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// A field was present with a value of the wrong shape.
    #[error("invalid field value: {0}")]
    InvalidField(String),

    /// `first_name` was supplied but empty.
    #[error("first_name must not be empty")]
    EmptyFirstName,
}

/// Return the required fields absent from `map`, in declaration order.
pub fn missing_required(map: &Map<String, Value>) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !map.contains_key(*field))
        .collect()
}

pub(crate) fn as_object(value: &Value) -> Result<&Map<String, Value>, ValidationError> {
    value.as_object().ok_or(ValidationError::NotAnObject)
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidField(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_lists_absent_fields_in_order() {
        let value = serde_json::json!({ "first_name": "E", "email": "e@x" });
        let map = as_object(&value).ok();
        let missing = map.map(missing_required);
        assert_eq!(missing, Some(vec!["last_name", "age"]));
    }

    #[test]
    fn missing_fields_message_names_every_field() {
        let err = ValidationError::MissingFields(vec!["email", "age"]);
        assert_eq!(err.to_string(), "missing_required_fields: email, age");
    }

    #[test]
    fn decode_errors_become_invalid_field() {
        let err = serde_json::from_value::<i64>(serde_json::json!("31"))
            .map_err(ValidationError::from)
            .err();
        assert!(matches!(err, Some(ValidationError::InvalidField(_))));
    }
}

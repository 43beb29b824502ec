//! Person records: the mutable field set, the live record, partial
//! updates, and immutable history snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::ids::{PersonId, SnapshotId};
use crate::validation::{self, ValidationError, as_object};
use crate::version::Version;

/// Every mutable field of a person.
///
/// Create and overwrite replace this set as a whole. `middle_name` is the
/// only optional field and defaults to absent when not supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PersonFields {
    /// Given name. Never empty.
    pub first_name: String,
    /// Optional middle name.
    #[serde(default)]
    pub middle_name: Option<String>,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
    /// Age in years.
    pub age: i64,
}

impl PersonFields {
    /// Build a full field set from a JSON object.
    ///
    /// Every key in [`validation::REQUIRED_FIELDS`] must be present. Keys
    /// outside [`validation::MUTABLE_FIELDS`] are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingFields`] when required keys are
    /// absent, [`ValidationError::InvalidField`] when a value has the wrong
    /// type, and [`ValidationError::NotAnObject`] for non-object payloads.
    /// Missing keys are checked first so every absent field is reported at
    /// once.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let map = as_object(value)?;

        let missing = validation::missing_required(map);
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        Ok(Self::deserialize(value)?)
    }

    /// Check the invariants a stored field set must satisfy.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyFirstName`] if `first_name` is empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.first_name.is_empty() {
            return Err(ValidationError::EmptyFirstName);
        }
        Ok(())
    }
}

/// A partial update: only the named fields change.
///
/// `middle_name` is doubly optional so that "leave alone" (`None`) and
/// "clear" (`Some(None)`) stay distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PersonPatch {
    /// New given name.
    pub first_name: Option<String>,
    /// New middle name, or `Some(None)` to clear it.
    #[serde(deserialize_with = "present_or_null")]
    pub middle_name: Option<Option<String>>,
    /// New family name.
    pub last_name: Option<String>,
    /// New email.
    pub email: Option<String>,
    /// New age.
    pub age: Option<i64>,
}

impl PersonPatch {
    /// Build a patch from a JSON object.
    ///
    /// Keys outside [`validation::MUTABLE_FIELDS`] (including `id` and
    /// `version`) are silently dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidField`] when a recognised key has
    /// a value of the wrong type, or [`ValidationError::NotAnObject`].
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        as_object(value)?;
        Ok(Self::deserialize(value)?)
    }

    /// Names of the fields this patch touches, for logging.
    pub fn touched_fields(&self) -> Vec<&'static str> {
        let mut touched = Vec::with_capacity(validation::MUTABLE_FIELDS.len());
        if self.first_name.is_some() {
            touched.push("first_name");
        }
        if self.middle_name.is_some() {
            touched.push("middle_name");
        }
        if self.last_name.is_some() {
            touched.push("last_name");
        }
        if self.email.is_some() {
            touched.push("email");
        }
        if self.age.is_some() {
            touched.push("age");
        }
        touched
    }

    /// Merge the named fields over `base`, leaving the rest untouched.
    #[must_use]
    pub fn apply_to(&self, base: &PersonFields) -> PersonFields {
        PersonFields {
            first_name: self
                .first_name
                .clone()
                .unwrap_or_else(|| base.first_name.clone()),
            middle_name: self
                .middle_name
                .clone()
                .unwrap_or_else(|| base.middle_name.clone()),
            last_name: self
                .last_name
                .clone()
                .unwrap_or_else(|| base.last_name.clone()),
            email: self.email.clone().unwrap_or_else(|| base.email.clone()),
            age: self.age.unwrap_or(base.age),
        }
    }
}

/// A key that is present maps to `Some`, even when its value is `null`.
/// Absent keys fall back to the field default of `None`.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// The current (live) state of a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Person {
    /// Identifier, immutable for the life of the record.
    pub id: PersonId,
    /// Current field values.
    #[serde(flatten)]
    pub fields: PersonFields,
    /// Number of the version these fields represent.
    pub version: Version,
}

impl Person {
    /// A freshly created person at [`Version::INITIAL`].
    pub const fn new(id: PersonId, fields: PersonFields) -> Self {
        Self {
            id,
            fields,
            version: Version::INITIAL,
        }
    }

    /// The state after replacing every field. `None` if the version would
    /// overflow.
    #[must_use]
    pub fn overwritten(&self, fields: PersonFields) -> Option<Self> {
        Some(Self {
            id: self.id,
            fields,
            version: self.version.next()?,
        })
    }

    /// The state after merging a partial update. `None` if the version
    /// would overflow.
    #[must_use]
    pub fn patched(&self, patch: &PersonPatch) -> Option<Self> {
        self.overwritten(patch.apply_to(&self.fields))
    }
}

/// An immutable copy of a person's fields as of one version.
///
/// Snapshots outlive the live record: `person_id` may name a person that
/// has since been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PersonSnapshot {
    /// Synthetic key of this snapshot.
    pub id: SnapshotId,
    /// The person this snapshot is a version of.
    pub person_id: PersonId,
    /// Field values as of `version`.
    #[serde(flatten)]
    pub fields: PersonFields,
    /// The version this snapshot represents.
    pub version: Version,
    /// When the snapshot was appended.
    pub archived_at: DateTime<Utc>,
}

impl PersonSnapshot {
    /// Present the snapshot in the same shape as a live [`Person`].
    pub fn to_person(&self) -> Person {
        Person {
            id: self.person_id,
            fields: self.fields.clone(),
            version: self.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> PersonFields {
        PersonFields {
            first_name: String::from("E"),
            middle_name: None,
            last_name: String::from("L"),
            email: String::from("e@x"),
            age: 30,
        }
    }

    #[test]
    fn from_json_reports_missing_fields() {
        let result = PersonFields::from_json(&serde_json::json!({ "first_name": "E" }));
        assert_eq!(
            result,
            Err(ValidationError::MissingFields(vec!["last_name", "email", "age"]))
        );
    }

    #[test]
    fn from_json_accepts_empty_strings_and_zero_age() {
        let fields = PersonFields::from_json(&serde_json::json!({
            "first_name": "E", "last_name": "", "email": "", "age": 0
        }));
        assert_eq!(
            fields.map(|f| (f.last_name, f.age, f.middle_name)),
            Ok((String::new(), 0, None))
        );
    }

    #[test]
    fn from_json_ignores_unknown_keys() {
        let fields = PersonFields::from_json(&serde_json::json!({
            "first_name": "E", "last_name": "L", "email": "e@x", "age": 30,
            "version": 99, "nickname": "ee"
        }));
        assert_eq!(fields, Ok(sample_fields()));
    }

    #[test]
    fn from_json_rejects_mistyped_values() {
        let result = PersonFields::from_json(&serde_json::json!({
            "first_name": "E", "last_name": "L", "email": "e@x", "age": "30"
        }));
        assert!(matches!(result, Err(ValidationError::InvalidField(_))));
    }

    #[test]
    fn from_json_reads_middle_name() {
        let fields = PersonFields::from_json(&serde_json::json!({
            "first_name": "E", "middle_name": "M", "last_name": "L", "email": "e@x", "age": 30
        }));
        assert_eq!(fields.map(|f| f.middle_name), Ok(Some(String::from("M"))));
    }

    #[test]
    fn from_json_rejects_non_object() {
        assert_eq!(
            PersonFields::from_json(&serde_json::json!([1, 2])),
            Err(ValidationError::NotAnObject)
        );
    }

    #[test]
    fn validate_rejects_empty_first_name() {
        let mut fields = sample_fields();
        fields.first_name.clear();
        assert_eq!(fields.validate(), Err(ValidationError::EmptyFirstName));
    }

    #[test]
    fn patch_only_changes_named_fields() {
        let patch = PersonPatch::from_json(&serde_json::json!({ "age": 31, "shoe_size": 9 }));
        let merged = patch.map(|p| p.apply_to(&sample_fields()));
        let mut expected = sample_fields();
        expected.age = 31;
        assert_eq!(merged, Ok(expected));
    }

    #[test]
    fn patch_distinguishes_clear_from_absent() {
        let mut base = sample_fields();
        base.middle_name = Some(String::from("M"));

        let untouched = PersonPatch::default().apply_to(&base);
        assert_eq!(untouched.middle_name.as_deref(), Some("M"));

        let cleared = PersonPatch::from_json(&serde_json::json!({ "middle_name": null }))
            .map(|p| p.apply_to(&base));
        assert_eq!(cleared.map(|f| f.middle_name), Ok(None));
    }

    #[test]
    fn patch_rejects_wrong_types() {
        for body in [
            serde_json::json!({ "age": "old" }),
            serde_json::json!({ "age": 31.5 }),
            serde_json::json!({ "middle_name": 4 }),
        ] {
            let result = PersonPatch::from_json(&body);
            assert!(
                matches!(result, Err(ValidationError::InvalidField(_))),
                "{body}"
            );
        }
    }

    #[test]
    fn patch_rejects_non_object() {
        assert_eq!(
            PersonPatch::from_json(&serde_json::json!("age")),
            Err(ValidationError::NotAnObject)
        );
    }

    #[test]
    fn patch_touched_fields() {
        let empty = PersonPatch::from_json(&serde_json::json!({ "id": 5, "version": 9 }));
        assert_eq!(empty, Ok(PersonPatch::default()));

        let patch = PersonPatch::from_json(&serde_json::json!({ "email": "x", "first_name": "F" }));
        assert_eq!(
            patch.map(|p| p.touched_fields()),
            Ok(vec!["first_name", "email"])
        );
    }

    #[test]
    fn overwrite_and_patch_advance_version() {
        let person = Person::new(PersonId::new(1), sample_fields());
        assert_eq!(person.version, Version::INITIAL);

        let patch = PersonPatch {
            age: Some(31),
            ..PersonPatch::default()
        };
        let next = person.patched(&patch);
        assert_eq!(next.as_ref().map(|p| p.version), Some(Version::new(2)));
        assert_eq!(next.map(|p| p.fields.age), Some(31));
    }

    #[test]
    fn person_serializes_flat() {
        let person = Person::new(PersonId::new(1), sample_fields());
        let json = serde_json::to_value(&person).ok();
        assert_eq!(
            json,
            Some(serde_json::json!({
                "id": 1,
                "first_name": "E",
                "middle_name": null,
                "last_name": "L",
                "email": "e@x",
                "age": 30,
                "version": 1
            }))
        );
    }

    #[test]
    fn snapshot_presents_as_person() {
        let snapshot = PersonSnapshot {
            id: SnapshotId::new(17),
            person_id: PersonId::new(3),
            fields: sample_fields(),
            version: Version::new(4),
            archived_at: Utc::now(),
        };
        let person = snapshot.to_person();
        assert_eq!(person.id, PersonId::new(3));
        assert_eq!(person.version, Version::new(4));
        assert_eq!(person.fields, sample_fields());
    }
}

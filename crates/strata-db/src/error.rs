//! Error types for the store.
//!
//! All errors are propagated via [`StoreError`], which wraps the underlying
//! [`sqlx`] errors with the person id or version the operation was about.
//! [`StoreError::kind`] folds every variant onto the three failure kinds a
//! caller has to distinguish.

use strata_types::{PersonId, ValidationError, Version};

/// `SQLITE_BUSY`: another connection holds a conflicting lock.
const SQLITE_BUSY: i32 = 5;

/// `SQLITE_LOCKED`: a conflicting lock inside the same shared cache.
const SQLITE_LOCKED: i32 = 6;

/// Errors that can occur in the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No live record exists for the person.
    #[error("person {0} not found")]
    PersonNotFound(PersonId),

    /// No snapshot exists for the exact (person, version) pair.
    #[error("person {id} has no version {version}")]
    VersionNotFound {
        /// The person that was looked up.
        id: PersonId,
        /// The version that was requested.
        version: Version,
    },

    /// The supplied field set cannot become a valid person.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A `SQLite` operation failed.
    #[error("SQLite error: {0}")]
    Database(#[from] sqlx::Error),

    /// A schema migration failed.
    #[error("SQLite migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The live row changed between read and write.
    #[error("concurrent write to person {0}")]
    WriteConflict(PersonId),

    /// Write conflicts persisted past the retry budget.
    #[error("gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// How many times the operation ran.
        attempts: u32,
        /// The conflict seen on the final attempt.
        #[source]
        source: Box<StoreError>,
    },

    /// The person's version counter cannot advance any further.
    #[error("version counter for person {0} overflowed")]
    VersionOverflow(PersonId),

    /// The identifier sequence row is missing or cannot advance.
    #[error("identifier sequence exhausted or missing")]
    IdSpaceExhausted,

    /// Stored history disagrees with the versioning rules.
    #[error("history integrity violation: {0}")]
    IntegrityViolation(String),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// The failure kinds visible to callers of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The id, or (id, version) pair, matched no record.
    NotFound,
    /// The caller-supplied field set was rejected.
    Validation,
    /// The backend could not commit. Nothing was applied.
    Storage,
}

impl StoreError {
    /// Classify this error into one of the caller-visible [`ErrorKind`]s.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PersonNotFound(_) | Self::VersionNotFound { .. } => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Database(_)
            | Self::Migration(_)
            | Self::WriteConflict(_)
            | Self::RetriesExhausted { .. }
            | Self::VersionOverflow(_)
            | Self::IdSpaceExhausted
            | Self::IntegrityViolation(_)
            | Self::Config(_) => ErrorKind::Storage,
        }
    }

    /// Whether rerunning the whole transaction may succeed.
    ///
    /// True for a lost optimistic version check and for `SQLite` lock
    /// contention (`SQLITE_BUSY`/`SQLITE_LOCKED` and their extended codes,
    /// including `SQLITE_BUSY_SNAPSHOT`).
    pub fn is_write_conflict(&self) -> bool {
        match self {
            Self::WriteConflict(_) => true,
            Self::Database(err) => is_lock_contention(err),
            _ => false,
        }
    }
}

fn is_lock_contention(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db_err) = err else {
        return false;
    };
    db_err
        .code()
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants_map_to_not_found() {
        let err = StoreError::PersonNotFound(PersonId::new(1));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = StoreError::VersionNotFound {
            id: PersonId::new(1),
            version: Version::new(9),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "person 1 has no version 9");
    }

    #[test]
    fn validation_maps_to_validation() {
        let err = StoreError::from(ValidationError::EmptyFirstName);
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn exhausted_retries_are_storage_failures() {
        let err = StoreError::RetriesExhausted {
            attempts: 3,
            source: Box::new(StoreError::WriteConflict(PersonId::new(4))),
        };
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(!err.is_write_conflict());
        assert!(err.to_string().contains("person 4"));
    }

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(StoreError::WriteConflict(PersonId::new(1)).is_write_conflict());
        assert!(!StoreError::PersonNotFound(PersonId::new(1)).is_write_conflict());
        assert!(!StoreError::Database(sqlx::Error::RowNotFound).is_write_conflict());
        assert!(!StoreError::Database(sqlx::Error::PoolTimedOut).is_write_conflict());
    }
}

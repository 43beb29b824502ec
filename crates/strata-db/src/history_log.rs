//! The append-only `person_archive` table.
//!
//! One snapshot per committed mutation, keyed by a synthetic id with a
//! unique `(person_id, version)` index. Nothing here updates or deletes
//! a snapshot, and triggers in the schema reject attempts to do so.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use strata_types::{PersonFields, PersonId, PersonSnapshot, SnapshotId, Version};

use crate::error::StoreError;

/// Operations on the `person_archive` table.
pub struct HistoryLog<'a> {
    pool: &'a SqlitePool,
}

impl<'a> HistoryLog<'a> {
    /// Create a new history log bound to a connection pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up the snapshot for an exact (person, version) pair.
    ///
    /// Works for deleted persons: their history is kept.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionNotFound`] if the person never existed
    /// or the version is out of range.
    pub async fn get_version(
        &self,
        id: PersonId,
        version: Version,
    ) -> Result<PersonSnapshot, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id, version)
            .await?
            .ok_or(StoreError::VersionNotFound { id, version })
    }

    pub(crate) async fn fetch(
        conn: &mut SqliteConnection,
        id: PersonId,
        version: Version,
    ) -> Result<Option<PersonSnapshot>, StoreError> {
        if !version.is_valid() {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, SnapshotRow>(
            r"SELECT id, person_id, first_name, middle_name, last_name, email, age, version, archived_at
              FROM person_archive
              WHERE person_id = ?1 AND version = ?2",
        )
        .bind(id.into_inner())
        .bind(version.into_inner())
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(PersonSnapshot::from))
    }

    /// Every archived version of a person, ascending.
    pub(crate) async fn versions(
        conn: &mut SqliteConnection,
        id: PersonId,
    ) -> Result<Vec<Version>, StoreError> {
        let versions: Vec<i64> = sqlx::query_scalar(
            r"SELECT version FROM person_archive WHERE person_id = ?1 ORDER BY version",
        )
        .bind(id.into_inner())
        .fetch_all(&mut *conn)
        .await?;

        Ok(versions.into_iter().map(Version::new).collect())
    }

    /// Insert an immutable snapshot.
    ///
    /// The caller decides the version; the log does not recompute it. A
    /// duplicate `(person_id, version)` fails on the unique index.
    pub(crate) async fn append(
        conn: &mut SqliteConnection,
        person_id: PersonId,
        version: Version,
        fields: &PersonFields,
        at: DateTime<Utc>,
    ) -> Result<SnapshotId, StoreError> {
        let id: i64 = sqlx::query_scalar(
            r"INSERT INTO person_archive
                (person_id, first_name, middle_name, last_name, email, age, version, archived_at)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
              RETURNING id",
        )
        .bind(person_id.into_inner())
        .bind(&fields.first_name)
        .bind(&fields.middle_name)
        .bind(&fields.last_name)
        .bind(&fields.email)
        .bind(fields.age)
        .bind(version.into_inner())
        .bind(at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(SnapshotId::new(id))
    }
}

/// A row from the `person_archive` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    /// Auto-incremented snapshot key.
    pub id: i64,
    /// The person this snapshot belongs to.
    pub person_id: i64,
    /// Given name at this version.
    pub first_name: String,
    /// Middle name at this version.
    pub middle_name: Option<String>,
    /// Family name at this version.
    pub last_name: String,
    /// Email at this version.
    pub email: String,
    /// Age at this version.
    pub age: i64,
    /// The version this snapshot represents.
    pub version: i64,
    /// When the snapshot was appended.
    pub archived_at: DateTime<Utc>,
}

impl From<SnapshotRow> for PersonSnapshot {
    fn from(row: SnapshotRow) -> Self {
        Self {
            id: SnapshotId::new(row.id),
            person_id: PersonId::new(row.person_id),
            fields: PersonFields {
                first_name: row.first_name,
                middle_name: row.middle_name,
                last_name: row.last_name,
                email: row.email,
                age: row.age,
            },
            version: Version::new(row.version),
            archived_at: row.archived_at,
        }
    }
}

//! The live `person` table.
//!
//! Reads are public. Writes are crate-private and only ever run inside a
//! transaction opened by the [`VersionCoordinator`](crate::VersionCoordinator),
//! so no live row changes without a matching history snapshot.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use strata_types::{Person, PersonFields, PersonId, Version};

use crate::error::StoreError;

/// Operations on the `person` table.
pub struct PersonStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PersonStore<'a> {
    /// Create a new person store bound to a connection pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Point lookup of the live record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PersonNotFound`] if no live row exists,
    /// including after deletion.
    pub async fn get(&self, id: PersonId) -> Result<Person, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id)
            .await?
            .ok_or(StoreError::PersonNotFound(id))
    }

    /// All live records in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn list(&self) -> Result<Vec<Person>, StoreError> {
        let rows = sqlx::query_as::<_, PersonRow>(
            r"SELECT id, first_name, middle_name, last_name, email, age, version, updated_at
              FROM person
              ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Person::from).collect())
    }

    pub(crate) async fn fetch(
        conn: &mut SqliteConnection,
        id: PersonId,
    ) -> Result<Option<Person>, StoreError> {
        let row = sqlx::query_as::<_, PersonRow>(
            r"SELECT id, first_name, middle_name, last_name, email, age, version, updated_at
              FROM person
              WHERE id = ?1",
        )
        .bind(id.into_inner())
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(Person::from))
    }

    pub(crate) async fn insert(
        conn: &mut SqliteConnection,
        person: &Person,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let f = &person.fields;
        sqlx::query(
            r"INSERT INTO person (id, first_name, middle_name, last_name, email, age, version, updated_at)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(person.id.into_inner())
        .bind(&f.first_name)
        .bind(&f.middle_name)
        .bind(&f.last_name)
        .bind(&f.email)
        .bind(f.age)
        .bind(person.version.into_inner())
        .bind(at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Replace the live row, guarded on the version it was read at.
    ///
    /// Returns `false` when no row matched, meaning another writer got
    /// there first or the person was deleted.
    pub(crate) async fn write(
        conn: &mut SqliteConnection,
        person: &Person,
        expected: Version,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let f = &person.fields;
        let result = sqlx::query(
            r"UPDATE person
              SET first_name = ?1, middle_name = ?2, last_name = ?3, email = ?4,
                  age = ?5, version = ?6, updated_at = ?7
              WHERE id = ?8 AND version = ?9",
        )
        .bind(&f.first_name)
        .bind(&f.middle_name)
        .bind(&f.last_name)
        .bind(&f.email)
        .bind(f.age)
        .bind(person.version.into_inner())
        .bind(at)
        .bind(person.id.into_inner())
        .bind(expected.into_inner())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete the live row. Returns `false` if there was none.
    pub(crate) async fn remove(conn: &mut SqliteConnection, id: PersonId) -> Result<bool, StoreError> {
        let result = sqlx::query(r"DELETE FROM person WHERE id = ?1")
            .bind(id.into_inner())
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// A row from the `person` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PersonRow {
    /// Person id.
    pub id: i64,
    /// Given name.
    pub first_name: String,
    /// Optional middle name.
    pub middle_name: Option<String>,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
    /// Age in years.
    pub age: i64,
    /// Current version.
    pub version: i64,
    /// Time of the last committed mutation.
    pub updated_at: DateTime<Utc>,
}

impl From<PersonRow> for Person {
    fn from(row: PersonRow) -> Self {
        Self {
            id: PersonId::new(row.id),
            fields: PersonFields {
                first_name: row.first_name,
                middle_name: row.middle_name,
                last_name: row.last_name,
                email: row.email,
                age: row.age,
            },
            version: Version::new(row.version),
        }
    }
}

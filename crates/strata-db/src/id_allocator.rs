//! Person identifier allocation.
//!
//! Ids come from a counter row in `id_sequence`, not from `max(id) + 1`
//! over live rows. Deleting the highest-numbered person therefore never
//! lowers the mark, and an id that appears in `person_archive` can never
//! be handed to a different person.

use sqlx::{SqliteConnection, SqlitePool};
use strata_types::PersonId;

use crate::error::StoreError;

/// Name of the `id_sequence` row backing person ids.
const PERSON_SEQUENCE: &str = "person";

/// Operations on the `id_sequence` table.
pub struct IdAllocator<'a> {
    pool: &'a SqlitePool,
}

impl<'a> IdAllocator<'a> {
    /// Create a new allocator bound to a connection pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// The largest id ever allocated, or `0` if none has been.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IdSpaceExhausted`] if the sequence row is
    /// missing, or [`StoreError::Database`] if the query fails.
    pub async fn high_water_mark(&self) -> Result<PersonId, StoreError> {
        let last: Option<i64> =
            sqlx::query_scalar(r"SELECT last_value FROM id_sequence WHERE name = ?1")
                .bind(PERSON_SEQUENCE)
                .fetch_optional(self.pool)
                .await?;

        last.map(PersonId::new).ok_or(StoreError::IdSpaceExhausted)
    }

    /// Advance the counter and return the new id.
    ///
    /// Runs on the caller's connection so the increment commits or rolls
    /// back together with the row that uses it. The `UPDATE` takes the
    /// write lock first, which serializes concurrent creators.
    pub(crate) async fn allocate(conn: &mut SqliteConnection) -> Result<PersonId, StoreError> {
        let next: Option<i64> = sqlx::query_scalar(
            r"UPDATE id_sequence
              SET last_value = last_value + 1
              WHERE name = ?1
              RETURNING last_value",
        )
        .bind(PERSON_SEQUENCE)
        .fetch_optional(&mut *conn)
        .await?;

        let id = next.map(PersonId::new).ok_or(StoreError::IdSpaceExhausted)?;
        tracing::trace!(person_id = %id, "Allocated person id");
        Ok(id)
    }
}

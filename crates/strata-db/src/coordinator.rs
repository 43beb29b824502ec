//! The version coordinator: every mutation of a live record goes through
//! here.
//!
//! Each create, overwrite, and partial update is one transaction that
//!
//! 1. reads the live row (or allocates an id for a new one),
//! 2. computes the new field state and `version + 1` (or 1),
//! 3. writes the live row, guarded on the version it read,
//! 4. appends a snapshot carrying the resulting fields and version,
//! 5. commits both writes together.
//!
//! A failure anywhere before the commit drops the transaction, which rolls
//! back both writes. Losing the version guard to a concurrent writer is a
//! [`StoreError::WriteConflict`], and the whole transaction is rerun under
//! the [`RetryPolicy`].
//!
//! Mutating transactions open with `BEGIN IMMEDIATE`, taking the write lock
//! before the first read. Concurrent writers queue on the connection's busy
//! timeout instead of failing on a stale WAL snapshot.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use strata_types::{Person, PersonFields, PersonId, PersonPatch};

use crate::error::StoreError;
use crate::history_log::HistoryLog;
use crate::id_allocator::IdAllocator;
use crate::person_store::PersonStore;
use crate::retry::RetryPolicy;

/// Atomic live-row + history mutations.
pub struct VersionCoordinator<'a> {
    pool: &'a SqlitePool,
    retry: RetryPolicy,
}

impl<'a> VersionCoordinator<'a> {
    /// Create a coordinator bound to a connection pool with the default
    /// [`RetryPolicy`].
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            pool,
            retry: RetryPolicy::DEFAULT,
        }
    }

    /// Set the retry policy for write conflicts.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Create a person at version 1 together with its first snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if `first_name` is empty, or a
    /// storage error if the transaction cannot commit. Nothing is written
    /// on failure, and the allocated id is rolled back with it.
    pub async fn create(&self, fields: &PersonFields) -> Result<Person, StoreError> {
        fields.validate()?;

        let person = self.retry.run("create", || self.try_create(fields)).await?;

        tracing::debug!(person_id = %person.id, version = %person.version, "Created person");
        Ok(person)
    }

    /// Replace every mutable field and advance the version by one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PersonNotFound`] if there is no live row,
    /// [`StoreError::Validation`] if `first_name` is empty, or a storage
    /// error if the transaction cannot commit.
    pub async fn overwrite(&self, id: PersonId, fields: &PersonFields) -> Result<Person, StoreError> {
        fields.validate()?;

        let next_state = |current: &Person| current.overwritten(fields.clone());
        let person = self
            .retry
            .run("overwrite", || self.try_mutate(id, &next_state))
            .await?;

        tracing::debug!(person_id = %person.id, version = %person.version, "Overwrote person");
        Ok(person)
    }

    /// Merge the fields named in `patch` and advance the version by one.
    ///
    /// An empty patch still produces a new version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PersonNotFound`] if there is no live row,
    /// [`StoreError::Validation`] if the patch would empty `first_name`,
    /// or a storage error if the transaction cannot commit.
    pub async fn update(&self, id: PersonId, patch: &PersonPatch) -> Result<Person, StoreError> {
        let next_state = |current: &Person| current.patched(patch);
        let person = self
            .retry
            .run("update", || self.try_mutate(id, &next_state))
            .await?;

        tracing::debug!(
            person_id = %person.id,
            version = %person.version,
            fields = ?patch.touched_fields(),
            "Updated person"
        );
        Ok(person)
    }

    /// Remove the live row. Its snapshots stay in the history log.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PersonNotFound`] if there is no live row.
    pub async fn delete(&self, id: PersonId) -> Result<(), StoreError> {
        self.retry.run("delete", || self.try_delete(id)).await?;

        tracing::debug!(person_id = %id, "Deleted person");
        Ok(())
    }

    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, StoreError> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    async fn try_create(&self, fields: &PersonFields) -> Result<Person, StoreError> {
        let mut tx = self.begin_write().await?;

        let id = IdAllocator::allocate(&mut tx).await?;
        let person = Person::new(id, fields.clone());
        let now = Utc::now();

        PersonStore::insert(&mut tx, &person, now).await?;
        HistoryLog::append(&mut tx, person.id, person.version, &person.fields, now).await?;

        tx.commit().await?;
        Ok(person)
    }

    async fn try_mutate<F>(&self, id: PersonId, next_state: &F) -> Result<Person, StoreError>
    where
        F: Fn(&Person) -> Option<Person> + Sync,
    {
        let mut tx = self.begin_write().await?;

        let current = PersonStore::fetch(&mut tx, id)
            .await?
            .ok_or(StoreError::PersonNotFound(id))?;
        let next = next_state(&current).ok_or(StoreError::VersionOverflow(id))?;
        next.fields.validate()?;
        let now = Utc::now();

        if !PersonStore::write(&mut tx, &next, current.version, now).await? {
            return Err(StoreError::WriteConflict(id));
        }
        HistoryLog::append(&mut tx, next.id, next.version, &next.fields, now).await?;

        tx.commit().await?;
        Ok(next)
    }

    async fn try_delete(&self, id: PersonId) -> Result<(), StoreError> {
        let mut tx = self.begin_write().await?;

        if !PersonStore::remove(&mut tx, id).await? {
            return Err(StoreError::PersonNotFound(id));
        }

        tx.commit().await?;
        Ok(())
    }
}

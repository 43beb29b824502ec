//! The operations the request layer consumes.
//!
//! [`PersonService`] owns a pool handle and builds the short-lived stores
//! per call. Mutations go through the [`VersionCoordinator`]; current reads
//! go straight to the [`PersonStore`] and versioned reads to the
//! [`HistoryLog`].

use sqlx::SqlitePool;
use strata_types::{Person, PersonFields, PersonId, PersonPatch, Version};

use crate::coordinator::VersionCoordinator;
use crate::error::StoreError;
use crate::history_log::HistoryLog;
use crate::integrity::{self, HistoryReport};
use crate::person_store::PersonStore;
use crate::retry::RetryPolicy;
use crate::sqlite::Database;

/// Create/read/update/delete over versioned persons.
#[derive(Clone)]
pub struct PersonService {
    pool: SqlitePool,
    retry: RetryPolicy,
}

impl PersonService {
    /// Create a service over an open database.
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
            retry: RetryPolicy::DEFAULT,
        }
    }

    /// Set the retry policy for write conflicts.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    fn coordinator(&self) -> VersionCoordinator<'_> {
        VersionCoordinator::new(&self.pool).with_retry_policy(self.retry)
    }

    /// Create a person and return its new id.
    ///
    /// # Errors
    ///
    /// See [`VersionCoordinator::create`].
    pub async fn create(&self, fields: &PersonFields) -> Result<PersonId, StoreError> {
        self.coordinator().create(fields).await.map(|p| p.id)
    }

    /// Current state of a person.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PersonNotFound`] if there is no live row.
    pub async fn read(&self, id: PersonId) -> Result<Person, StoreError> {
        PersonStore::new(&self.pool).get(id).await
    }

    /// Current state of every live person, ascending by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn read_all(&self) -> Result<Vec<Person>, StoreError> {
        PersonStore::new(&self.pool).list().await
    }

    /// State of a person as of `version`, shaped like a live record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionNotFound`] if no such snapshot exists.
    pub async fn read_version(&self, id: PersonId, version: Version) -> Result<Person, StoreError> {
        HistoryLog::new(&self.pool)
            .get_version(id, version)
            .await
            .map(|snapshot| snapshot.to_person())
    }

    /// Replace every field of a person.
    ///
    /// # Errors
    ///
    /// See [`VersionCoordinator::overwrite`].
    pub async fn overwrite(&self, id: PersonId, fields: &PersonFields) -> Result<(), StoreError> {
        self.coordinator().overwrite(id, fields).await.map(drop)
    }

    /// Change only the fields named in `patch`.
    ///
    /// # Errors
    ///
    /// See [`VersionCoordinator::update`].
    pub async fn update(&self, id: PersonId, patch: &PersonPatch) -> Result<(), StoreError> {
        self.coordinator().update(id, patch).await.map(drop)
    }

    /// Delete the live record, keeping its history.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PersonNotFound`] if there is no live row.
    pub async fn delete(&self, id: PersonId) -> Result<(), StoreError> {
        self.coordinator().delete(id).await
    }

    /// Check the stored history of a person.
    ///
    /// # Errors
    ///
    /// See [`integrity::verify_history`].
    pub async fn verify_history(&self, id: PersonId) -> Result<HistoryReport, StoreError> {
        integrity::verify_history(&self.pool, id).await
    }
}

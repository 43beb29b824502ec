//! History integrity check.
//!
//! Confirms, inside one read transaction, that a person's archived
//! versions are exactly `1..=n` and that the live row (if any) sits at
//! version `n` with fields equal to snapshot `n`.

use sqlx::SqlitePool;
use strata_types::{PersonId, Version};

use crate::error::StoreError;
use crate::history_log::HistoryLog;
use crate::person_store::PersonStore;

/// Result of a successful [`verify_history`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryReport {
    /// The person that was checked.
    pub person_id: PersonId,
    /// Number of snapshots in the history log.
    pub snapshot_count: usize,
    /// Highest archived version, `None` if the person never existed.
    pub latest_version: Option<Version>,
    /// Version of the live row, `None` if it was deleted or never existed.
    pub live_version: Option<Version>,
}

/// Verify the history of one person.
///
/// # Errors
///
/// Returns [`StoreError::IntegrityViolation`] describing the first broken
/// rule, or [`StoreError::Database`] if a query fails.
pub async fn verify_history(pool: &SqlitePool, id: PersonId) -> Result<HistoryReport, StoreError> {
    let mut tx = pool.begin().await?;

    let versions = HistoryLog::versions(&mut tx, id).await?;
    for (expected, found) in (1_i64..).zip(&versions) {
        if found.into_inner() != expected {
            return Err(StoreError::IntegrityViolation(format!(
                "person {id}: expected version {expected}, found {found}"
            )));
        }
    }
    let latest_version = versions.last().copied();

    let live = PersonStore::fetch(&mut tx, id).await?;
    if let Some(live) = &live {
        let Some(latest) = latest_version else {
            return Err(StoreError::IntegrityViolation(format!(
                "person {id}: live row has no history"
            )));
        };
        if latest != live.version {
            return Err(StoreError::IntegrityViolation(format!(
                "person {id}: live version {} but latest snapshot is {latest}",
                live.version
            )));
        }
        let snapshot = HistoryLog::fetch(&mut tx, id, latest).await?;
        if snapshot.map(|s| s.fields).as_ref() != Some(&live.fields) {
            return Err(StoreError::IntegrityViolation(format!(
                "person {id}: live fields differ from snapshot {latest}"
            )));
        }
    }

    tx.commit().await?;

    Ok(HistoryReport {
        person_id: id,
        snapshot_count: versions.len(),
        latest_version,
        live_version: live.map(|p| p.version),
    })
}

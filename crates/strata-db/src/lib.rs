//! Data layer for Strata: versioned persons on `SQLite`.
//!
//! Every mutation of a live person commits together with an immutable
//! snapshot of the resulting state, so the full history of each person is
//! kept even after the person is deleted.
//!
//! # Architecture
//!
//! ```text
//! PersonService
//!     |
//!     +-- create / overwrite / update / delete --> VersionCoordinator
//!     |       (one transaction per call)
//!     |       |-- IdAllocator   (id_sequence high-water mark)
//!     |       |-- PersonStore   (live `person` row, version-guarded)
//!     |       +-- HistoryLog    (append to `person_archive`)
//!     |
//!     +-- read / read_all ----------------------> PersonStore
//!     +-- read_version -------------------------> HistoryLog
//! ```
//!
//! # Modules
//!
//! - [`sqlite`] -- Connection pool, configuration, embedded migrations
//! - [`id_allocator`] -- Never-reused person ids
//! - [`person_store`] -- The live `person` table
//! - [`history_log`] -- The append-only `person_archive` table
//! - [`coordinator`] -- Atomic live-row + snapshot mutations
//! - [`retry`] -- Write-conflict retry policy
//! - [`integrity`] -- History invariant check
//! - [`service`] -- The operation set consumed by the request layer
//! - [`error`] -- Shared error types

pub mod coordinator;
pub mod error;
pub mod history_log;
pub mod id_allocator;
pub mod integrity;
pub mod person_store;
pub mod retry;
pub mod service;
pub mod sqlite;

// Re-export primary types for convenience.
pub use coordinator::VersionCoordinator;
pub use error::{ErrorKind, StoreError};
pub use history_log::{HistoryLog, SnapshotRow};
pub use id_allocator::IdAllocator;
pub use integrity::{HistoryReport, verify_history};
pub use person_store::{PersonRow, PersonStore};
pub use retry::RetryPolicy;
pub use service::PersonService;
pub use sqlite::{Database, DatabaseConfig};

//! Shared type definitions for the Strata versioned person store.
//!
//! This crate is the single source of truth for the domain types used
//! across the workspace: the store (`strata-db`), the HTTP boundary
//! (`strata-api`), and the server binary. Types flow downstream to
//! `TypeScript` via `ts-rs` for API clients.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrappers for person ids and snapshot keys
//! - [`version`] -- The per-person version counter
//! - [`person`] -- Field sets, live records, partial updates, snapshots
//! - [`validation`] -- Field allow-lists and [`ValidationError`]

pub mod ids;
pub mod person;
pub mod validation;
pub mod version;

// Re-export all public types at crate root for convenience.
pub use ids::{PersonId, SnapshotId};
pub use person::{Person, PersonFields, PersonPatch, PersonSnapshot};
pub use validation::{MUTABLE_FIELDS, REQUIRED_FIELDS, ValidationError};
pub use version::Version;

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // Files are written to `bindings/` relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::PersonId::export_all();
        let _ = crate::ids::SnapshotId::export_all();
        let _ = crate::version::Version::export_all();
        let _ = crate::person::PersonFields::export_all();
        let _ = crate::person::Person::export_all();
        let _ = crate::person::PersonSnapshot::export_all();
    }
}

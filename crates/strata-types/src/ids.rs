//! Type-safe identifier wrappers around `i64`.
//!
//! Live persons and archived snapshots live in different key spaces. Keeping
//! them as distinct types stops a snapshot key from being passed where a
//! person id is expected (and the reverse) at compile time.
//!
//! Person ids are handed out by the store's identifier allocator and are
//! never reused, even after the person is deleted. Snapshot ids are assigned
//! by the database when a snapshot is appended.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates a newtype wrapper around `i64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw database key.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Return the inner `i64` value.
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl core::str::FromStr for $name {
            type Err = core::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier of a person (live record). Allocated once, never reused.
    PersonId
}

define_id! {
    /// Synthetic key of a history snapshot, independent of the person id.
    SnapshotId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&PersonId::new(7)).ok();
        assert_eq!(json.as_deref(), Some("7"));
    }

    #[test]
    fn id_parses_from_path_segment() {
        assert_eq!("42".parse::<PersonId>().ok(), Some(PersonId::new(42)));
        assert!("abc".parse::<PersonId>().is_err());
        assert!("".parse::<SnapshotId>().is_err());
    }

    #[test]
    fn id_display_matches_inner() {
        let id = SnapshotId::new(19);
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}

//! Per-person version counter.
//!
//! A person starts at [`Version::INITIAL`] and every successful mutation
//! moves it forward by exactly one. The counter never decrements and never
//! skips, so the archived versions of a person always form `1..=current`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A positive, per-person version number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct Version(pub i64);

impl Version {
    /// The version assigned on creation.
    pub const INITIAL: Self = Self(1);

    /// Wrap a raw version number.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Return the inner `i64` value.
    pub const fn into_inner(self) -> i64 {
        self.0
    }

    /// The version that follows this one, or `None` on overflow.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    /// Whether this is a valid stored version (at least 1).
    pub const fn is_valid(self) -> bool {
        self.0 >= 1
    }
}

impl core::fmt::Display for Version {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl core::str::FromStr for Version {
    type Err = core::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(Self)
    }
}

impl From<i64> for Version {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

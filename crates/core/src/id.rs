//! Identifiers for knowledge base entities.

use serde::{Deserialize, Serialize};

/// Identifier of a point inside one collection's index namespace.
///
/// Assigned as `collection.size + offset` at upload time, so ids are dense
/// and never reused within a collection.
pub type PointId = u64;

/// Identifier of a collection, assigned by whoever builds it (dataset scan,
/// caller code). Serialized as a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(u64);

impl CollectionId {
    /// Wrap a raw integer id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw integer value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for CollectionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for CollectionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

//! # Wire Type Catalog
//!
//! The fixed catalog of wire categories. Each category has a stable index
//! (used by the persistence record), a maximum span and the resources it is
//! refunded as when a link is salvaged.
//!
//! A link's type is fixed when it is created; categories never convert
//! into one another.

use crate::{ResourceStack, WireNetError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A wire category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireType {
    Copper,
    Gold,
    Festive,
}

impl WireType {
    /// Every catalog entry, ordered by index.
    pub const ALL: [WireType; 3] = [WireType::Copper, WireType::Gold, WireType::Festive];

    /// Number of catalog entries.
    pub const COUNT: usize = Self::ALL.len();

    /// Look up a wire type by its persisted index.
    ///
    /// Total: any index outside the catalog yields `None`.
    #[must_use]
    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Look up a wire type by name (`copper`, `gold`, `festive`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Stable catalog index.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Copper => 0,
            Self::Gold => 1,
            Self::Festive => 2,
        }
    }

    /// Catalog name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Copper => "copper",
            Self::Gold => "gold",
            Self::Festive => "festive",
        }
    }

    /// Maximum span of this wire in world units.
    #[must_use]
    pub const fn max_span(self) -> i64 {
        match self {
            Self::Copper | Self::Gold => 12,
            Self::Festive => 8,
        }
    }

    /// Squared maximum span.
    #[must_use]
    pub const fn max_span_sq(self) -> i64 {
        self.max_span() * self.max_span()
    }

    /// Resource refunded per salvaged slot at full cost.
    #[must_use]
    pub const fn drop_stack(self) -> ResourceStack {
        match self {
            Self::Copper => ResourceStack::new("copper_wire", 1),
            Self::Gold => ResourceStack::new("gold_wire", 1),
            Self::Festive => ResourceStack::new("festive_wire", 1),
        }
    }

    /// Resource refunded per salvaged slot when the actor spends a spool token.
    #[must_use]
    pub const fn source_drop(self) -> ResourceStack {
        match self {
            Self::Copper => ResourceStack::new("copper_spool", 1),
            Self::Gold => ResourceStack::new("gold_spool", 1),
            Self::Festive => ResourceStack::new("festive_spool", 1),
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WireType {
    type Err = WireNetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| WireNetError::UnknownWireType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_index_is_total() {
        assert_eq!(WireType::from_index(0), Some(WireType::Copper));
        assert_eq!(WireType::from_index(2), Some(WireType::Festive));
        assert_eq!(WireType::from_index(3), None);
        assert_eq!(WireType::from_index(-1), None);
        assert_eq!(WireType::from_index(i32::MAX), None);
        assert_eq!(WireType::from_index(i32::MIN), None);
    }

    #[test]
    fn index_matches_catalog_position() {
        for (i, wire) in WireType::ALL.iter().enumerate() {
            assert_eq!(wire.index(), i);
        }
    }

    #[test]
    fn name_lookup() {
        assert_eq!("gold".parse::<WireType>().expect("parse"), WireType::Gold);
        assert!("silver".parse::<WireType>().is_err());
    }

    #[test]
    fn spans_never_exceed_protocol_bound() {
        for wire in WireType::ALL {
            assert!(wire.max_span() <= crate::primitives::MAX_LENGTH);
        }
    }

    #[test]
    fn drops_are_single_units() {
        for wire in WireType::ALL {
            assert_eq!(wire.drop_stack().count, 1);
            assert_eq!(wire.source_drop().count, 1);
            assert_ne!(wire.drop_stack().item, wire.source_drop().item);
        }
    }
}

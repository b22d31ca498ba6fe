//! # Core Type Definitions
//!
//! This module contains the value types shared by every part of the CORE:
//! - World addressing (`Position`, `EntityId`)
//! - Slot addressing (`SlotIndex`)
//! - Resource accounting (`ResourceStack`)
//! - Error types (`WireNetError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Use saturating arithmetic where overflow is possible

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identity of an entity placed in the world.
///
/// Two positions that resolve to the same `EntityId` belong to the same
/// entity (multi-block footprints).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a connection slot on a single entity.
pub type SlotIndex = usize;

// =============================================================================
// POSITION
// =============================================================================

/// An integer world position.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Squared straight-line distance to another position.
    ///
    /// Computed in `i64`, saturating at `i64::MAX` for extreme coordinates.
    #[must_use]
    pub fn distance_sq(&self, other: &Position) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        let dz = i64::from(self.z) - i64::from(other.z);
        dx.saturating_mul(dx)
            .saturating_add(dy.saturating_mul(dy))
            .saturating_add(dz.saturating_mul(dz))
    }

    /// The position shifted by the given deltas (saturating).
    #[must_use]
    pub const fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

impl FromStr for Position {
    type Err = WireNetError;

    /// Parse `"x,y,z"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [x, y, z] = parts.as_slice() else {
            return Err(WireNetError::InvalidPosition(s.to_string()));
        };
        let parse = |v: &str| {
            v.parse::<i32>()
                .map_err(|_| WireNetError::InvalidPosition(s.to_string()))
        };
        Ok(Self::new(parse(*x)?, parse(*y)?, parse(*z)?))
    }
}

// =============================================================================
// RESOURCES
// =============================================================================

/// A quantity of a consumable resource, handed to drop/inventory sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceStack {
    /// Item name of the resource.
    pub item: &'static str,
    /// Number of units in the stack.
    pub count: u32,
}

impl ResourceStack {
    /// Create a new stack.
    #[must_use]
    pub const fn new(item: &'static str, count: u32) -> Self {
        Self { item, count }
    }

    /// Grow the stack by `n` units (saturating).
    pub fn grow(&mut self, n: u32) {
        self.count = self.count.saturating_add(n);
    }

    /// A stack with no units carries nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Infrastructure errors of the Wirenet system.
///
/// Protocol outcomes (rejected links, missing connections) are reported as
/// `ConnectResult`/`DisconnectResult` values, not as errors. This type covers
/// failures of the primitives and backing stores underneath them.
#[derive(Debug, Error)]
pub enum WireNetError {
    /// A slot index beyond the entity's slot count reached the mutation primitive.
    #[error("Slot {slot} out of range (entity has {count} slots)")]
    SlotOutOfRange { slot: SlotIndex, count: usize },

    /// Placement collided with an existing entity.
    #[error("Position {0} is already occupied")]
    PositionOccupied(Position),

    /// An entity with this id already exists.
    #[error("Duplicate entity: {0}")]
    DuplicateEntity(EntityId),

    /// The requested entity does not exist.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// A position string could not be parsed.
    #[error("Invalid position: {0:?} (expected x,y,z)")]
    InvalidPosition(String),

    /// A wire type name is not in the catalog.
    #[error("Unknown wire type: {0}")]
    UnknownWireType(String),

    /// An entity kind name is not known.
    #[error("Unknown entity kind: {0}")]
    UnknownEntityKind(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O or database error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// The configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_sq_is_symmetric() {
        let a = Position::new(0, 64, 0);
        let b = Position::new(3, 60, 12);
        assert_eq!(a.distance_sq(&b), 9 + 16 + 144);
        assert_eq!(a.distance_sq(&b), b.distance_sq(&a));
    }

    #[test]
    fn distance_sq_saturates() {
        let a = Position::new(i32::MIN, i32::MIN, i32::MIN);
        let b = Position::new(i32::MAX, i32::MAX, i32::MAX);
        assert_eq!(a.distance_sq(&b), i64::MAX);
    }

    #[test]
    fn position_parse() {
        let pos: Position = " 1, -2 ,3".parse().expect("parse");
        assert_eq!(pos, Position::new(1, -2, 3));

        assert!("1,2".parse::<Position>().is_err());
        assert!("1,2,z".parse::<Position>().is_err());
        assert!("1,2,3,4".parse::<Position>().is_err());
    }

    #[test]
    fn position_display_parses_back() {
        let pos = Position::new(-7, 0, 42);
        let back: Position = pos.to_string().parse().expect("parse");
        assert_eq!(back, pos);
    }

    #[test]
    fn resource_stack_grow() {
        let mut stack = ResourceStack::new("copper_wire", 1);
        stack.grow(2);
        assert_eq!(stack.count, 3);
        assert!(!stack.is_empty());
        assert!(ResourceStack::new("copper_wire", 0).is_empty());
    }
}

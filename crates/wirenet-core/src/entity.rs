//! # Entity Kinds
//!
//! Concrete world entities. Kinds that carry wires own a `Connector`, which
//! implements the `WireNode` capability; inert kinds do not.

use crate::node::{NodeEndpoint, Slots, WireNode};
use crate::{EntityId, Position, SlotIndex, WireNetError};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ENTITY KIND
// =============================================================================

/// The kinds of entity that can be placed in a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Single block, 4 bidirectional slots.
    SmallConnector,
    /// Single block, 8 bidirectional slots.
    LargeConnector,
    /// Two blocks tall. Slots 0..4 receive, slots 4..8 emit.
    Accumulator,
    /// A plain block without connection slots.
    Block,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::SmallConnector,
        EntityKind::LargeConnector,
        EntityKind::Accumulator,
        EntityKind::Block,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SmallConnector => "small_connector",
            Self::LargeConnector => "large_connector",
            Self::Accumulator => "accumulator",
            Self::Block => "block",
        }
    }

    /// Slot count, or `None` for kinds without the wire capability.
    #[must_use]
    pub const fn slot_count(self) -> Option<usize> {
        match self {
            Self::SmallConnector => Some(4),
            Self::LargeConnector | Self::Accumulator => Some(8),
            Self::Block => None,
        }
    }

    /// Positions occupied when placed at `origin`. The origin comes first.
    #[must_use]
    pub fn footprint(self, origin: Position) -> Vec<Position> {
        match self {
            Self::Accumulator => vec![origin, origin.offset(0, 1, 0)],
            _ => vec![origin],
        }
    }

    fn accepts(self, slot: SlotIndex) -> bool {
        !matches!(self, Self::Accumulator) || slot < 4
    }

    fn emits(self, slot: SlotIndex) -> bool {
        !matches!(self, Self::Accumulator) || slot >= 4
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = WireNetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| WireNetError::UnknownEntityKind(s.to_string()))
    }
}

// =============================================================================
// CONNECTOR
// =============================================================================

/// Slot-owning state of a wire-capable entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connector {
    kind: EntityKind,
    pos: Position,
    slots: Slots,
}

impl Connector {
    /// Create a connector with all slots open. `None` for inert kinds.
    #[must_use]
    pub fn new(kind: EntityKind, pos: Position) -> Option<Self> {
        kind.slot_count().map(|count| Self {
            kind,
            pos,
            slots: Slots::new(count),
        })
    }

    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }
}

impl WireNode for Connector {
    fn my_pos(&self) -> Position {
        self.pos
    }

    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn slot_at(&self, slot: SlotIndex) -> Option<NodeEndpoint> {
        self.slots.get(slot).copied()
    }

    fn set_slot(&mut self, slot: SlotIndex, endpoint: NodeEndpoint) -> Result<(), WireNetError> {
        self.slots.set(slot, endpoint)
    }

    fn is_input(&self, slot: SlotIndex) -> bool {
        self.kind.accepts(slot)
    }

    fn is_output(&self, slot: SlotIndex) -> bool {
        self.kind.emits(slot)
    }

    fn connected_slots(&self) -> Cow<'_, [SlotIndex]> {
        Cow::Borrowed(self.slots.connected())
    }
}

// =============================================================================
// ENTITY
// =============================================================================

/// An entity placed in the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    origin: Position,
    node: Option<Connector>,
}

impl Entity {
    /// Create an entity of `kind` at `origin` with all slots open.
    #[must_use]
    pub fn new(id: EntityId, kind: EntityKind, origin: Position) -> Self {
        Self {
            id,
            kind,
            origin,
            node: Connector::new(kind, origin),
        }
    }

    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    #[must_use]
    pub const fn origin(&self) -> Position {
        self.origin
    }

    #[must_use]
    pub fn footprint(&self) -> Vec<Position> {
        self.kind.footprint(self.origin)
    }

    /// The wire capability, if this kind has one.
    #[must_use]
    pub fn as_wire_node(&self) -> Option<&dyn WireNode> {
        self.node.as_ref().map(|c| c as &dyn WireNode)
    }

    pub fn as_wire_node_mut(&mut self) -> Option<&mut dyn WireNode> {
        self.node.as_mut().map(|c| c as &mut dyn WireNode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WireType;

    #[test]
    fn block_has_no_capability() {
        let entity = Entity::new(EntityId(1), EntityKind::Block, Position::default());
        assert!(entity.as_wire_node().is_none());
        assert!(Connector::new(EntityKind::Block, Position::default()).is_none());
    }

    #[test]
    fn slot_counts_per_kind() {
        let small = Connector::new(EntityKind::SmallConnector, Position::default()).expect("small");
        let large = Connector::new(EntityKind::LargeConnector, Position::default()).expect("large");
        assert_eq!(small.slot_count(), 4);
        assert_eq!(large.slot_count(), 8);
    }

    #[test]
    fn accumulator_directions() {
        let acc = Connector::new(EntityKind::Accumulator, Position::default()).expect("acc");
        assert!(acc.is_input(0) && !acc.is_output(0));
        assert!(acc.is_input(3) && !acc.is_output(3));
        assert!(!acc.is_input(4) && acc.is_output(4));
        assert!(!acc.is_input(7) && acc.is_output(7));
    }

    #[test]
    fn accumulator_footprint_is_two_tall() {
        let origin = Position::new(5, 64, 5);
        let acc = Entity::new(EntityId(7), EntityKind::Accumulator, origin);
        assert_eq!(acc.footprint(), vec![origin, Position::new(5, 65, 5)]);
    }

    #[test]
    fn connector_cache_tracks_mutation() {
        let mut node =
            Connector::new(EntityKind::SmallConnector, Position::default()).expect("small");
        let peer = Position::new(1, 0, 0);
        node.set_slot(1, NodeEndpoint::linked(peer, 0, WireType::Copper))
            .expect("set");
        assert_eq!(node.connected_slots().as_ref(), &[1]);
        node.remove_slot(1).expect("remove");
        assert!(node.connected_slots().is_empty());
    }

    #[test]
    fn kind_names_parse() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.name().parse::<EntityKind>().expect("parse"), kind);
        }
        assert!("lamp".parse::<EntityKind>().is_err());
    }
}

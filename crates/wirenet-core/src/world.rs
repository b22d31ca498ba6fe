//! # World
//!
//! The entity resolver consumed by the connection protocol, and `Grid`, its
//! in-memory implementation.
//!
//! All data structures use `BTreeMap` for deterministic ordering.

use crate::entity::{Entity, EntityKind};
use crate::node::WireNode;
use crate::{EntityId, Position, WireNetError};
use std::collections::BTreeMap;

// =============================================================================
// WORLD TRAIT
// =============================================================================

/// Resolves world positions to entities and entities to their wire capability.
pub trait World {
    /// The entity occupying `pos`, if any.
    fn lookup(&self, pos: Position) -> Option<EntityId>;

    /// The wire capability of `id`. `None` if the entity is missing or inert.
    fn wire_node(&self, id: EntityId) -> Option<&dyn WireNode>;

    /// Mutable wire capability of `id`.
    fn wire_node_mut(&mut self, id: EntityId) -> Option<&mut dyn WireNode>;
}

// =============================================================================
// GRID
// =============================================================================

/// In-memory world: an occupancy map over an entity table.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    /// Position -> occupying entity (every footprint cell)
    occupancy: BTreeMap<Position, EntityId>,

    /// EntityId -> Entity
    entities: BTreeMap<EntityId, Entity>,

    /// Next available EntityId
    next_entity_id: u64,
}

impl Grid {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a new entity of `kind` at `origin`, assigning the next id.
    pub fn place(&mut self, kind: EntityKind, origin: Position) -> Result<EntityId, WireNetError> {
        let id = EntityId(self.next_entity_id);
        self.insert(Entity::new(id, kind, origin))?;
        Ok(id)
    }

    /// Insert an entity under its own id (used when restoring a world).
    ///
    /// Fails without side effects if any footprint cell is occupied.
    pub fn insert(&mut self, entity: Entity) -> Result<(), WireNetError> {
        let footprint = entity.footprint();
        if let Some(taken) = footprint
            .iter()
            .find(|pos| self.occupancy.contains_key(*pos))
        {
            return Err(WireNetError::PositionOccupied(*taken));
        }

        let id = entity.id();
        if self.entities.contains_key(&id) {
            return Err(WireNetError::DuplicateEntity(id));
        }
        if id.0 >= self.next_entity_id {
            self.next_entity_id = id.0.saturating_add(1);
        }
        for pos in footprint {
            self.occupancy.insert(pos, id);
        }
        self.entities.insert(id, entity);
        Ok(())
    }

    /// Remove an entity and free its footprint.
    ///
    /// This does not touch the entity's peers; detach its links first.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        for pos in entity.footprint() {
            self.occupancy.remove(&pos);
        }
        Some(entity)
    }

    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// The entity occupying `pos`.
    #[must_use]
    pub fn entity_at(&self, pos: Position) -> Option<&Entity> {
        self.occupancy
            .get(&pos)
            .and_then(|id| self.entities.get(id))
    }

    /// All entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn next_entity_id(&self) -> u64 {
        self.next_entity_id
    }

    /// Raise the id counter (ids are never reused after removal).
    pub fn reserve_ids(&mut self, next_entity_id: u64) {
        self.next_entity_id = self.next_entity_id.max(next_entity_id);
    }

    /// Number of links. Every link occupies one slot on each side.
    #[must_use]
    pub fn link_count(&self) -> usize {
        let linked_slots: usize = self
            .entities
            .values()
            .filter_map(|entity| entity.as_wire_node())
            .map(|node| node.connected_slots().len())
            .sum();
        linked_slots / 2
    }
}

impl World for Grid {
    fn lookup(&self, pos: Position) -> Option<EntityId> {
        self.occupancy.get(&pos).copied()
    }

    fn wire_node(&self, id: EntityId) -> Option<&dyn WireNode> {
        self.entities.get(&id)?.as_wire_node()
    }

    fn wire_node_mut(&mut self, id: EntityId) -> Option<&mut dyn WireNode> {
        self.entities.get_mut(&id)?.as_wire_node_mut()
    }
}

// =============================================================================
// TESTS
// =============================================================================

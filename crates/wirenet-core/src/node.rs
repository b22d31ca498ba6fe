//! # Slot Model
//!
//! The per-slot connection state (`NodeEndpoint`), the fixed-capacity slot
//! array that owns it (`Slots`), and the `WireNode` capability implemented by
//! every entity kind that can carry wires.
//!
//! `WireNode::set_slot` is the only mutation primitive. Everything else is a
//! query derived from `slot_at`.

use crate::primitives::MAX_NODES;
use crate::record::{self, NodeRecord};
use crate::{Position, SlotIndex, WireNetError, WireType};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cell::OnceCell;

// =============================================================================
// NODE ENDPOINT
// =============================================================================

/// The far side of a linked slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    /// Position of the peer entity.
    pub pos: Position,
    /// Slot on the peer entity that mirrors this one.
    pub slot: SlotIndex,
    /// Wire carried by the link.
    pub wire: WireType,
}

/// State of one connection slot.
///
/// Position, peer slot and wire type are present together or not at all;
/// an endpoint without a peer is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NodeEndpoint {
    peer: Option<Peer>,
}

impl NodeEndpoint {
    /// An open endpoint.
    #[must_use]
    pub const fn open() -> Self {
        Self { peer: None }
    }

    /// An endpoint linked to `slot` on the entity at `pos`.
    #[must_use]
    pub const fn linked(pos: Position, slot: SlotIndex, wire: WireType) -> Self {
        Self {
            peer: Some(Peer { pos, slot, wire }),
        }
    }

    #[must_use]
    pub const fn peer(&self) -> Option<Peer> {
        self.peer
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.peer.is_none()
    }
}

// =============================================================================
// SLOT ARRAY
// =============================================================================

/// Fixed-capacity slot storage for one entity.
///
/// The list of connected slot indices is computed lazily and dropped on every
/// mutation.
#[derive(Debug, Clone)]
pub struct Slots {
    endpoints: [NodeEndpoint; MAX_NODES],
    count: usize,
    connected: OnceCell<Vec<SlotIndex>>,
}

impl Slots {
    /// Create `count` open slots. `count` is clamped to `1..=MAX_NODES`.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            endpoints: [NodeEndpoint::open(); MAX_NODES],
            count: count.clamp(1, MAX_NODES),
            connected: OnceCell::new(),
        }
    }

    /// Number of usable slots.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Always false: an entity owns at least one slot.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Endpoint at `slot`, or `None` past the slot count.
    #[must_use]
    pub fn get(&self, slot: SlotIndex) -> Option<&NodeEndpoint> {
        self.endpoints[..self.count].get(slot)
    }

    /// Overwrite the endpoint at `slot` and drop the cached view.
    pub fn set(&mut self, slot: SlotIndex, endpoint: NodeEndpoint) -> Result<(), WireNetError> {
        let count = self.count;
        let target = self.endpoints[..count]
            .get_mut(slot)
            .ok_or(WireNetError::SlotOutOfRange { slot, count })?;
        *target = endpoint;
        self.invalidate();
        Ok(())
    }

    /// Drop the cached connected-slot view.
    fn invalidate(&mut self) {
        self.connected.take();
    }

    /// Indices of linked slots, ascending.
    pub fn connected(&self) -> &[SlotIndex] {
        self.connected.get_or_init(|| {
            self.iter()
                .enumerate()
                .filter(|(_, ep)| !ep.is_open())
                .map(|(i, _)| i)
                .collect()
        })
    }

    /// Iterate the usable endpoints in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeEndpoint> {
        self.endpoints[..self.count].iter()
    }
}

impl PartialEq for Slots {
    fn eq(&self, other: &Self) -> bool {
        self.endpoints[..self.count] == other.endpoints[..other.count]
    }
}

impl Eq for Slots {}

// =============================================================================
// WIRENODE CAPABILITY
// =============================================================================

/// Capability of a world entity that owns connection slots.
///
/// Implementors provide storage (`slot_at`, `set_slot`) and identity
/// (`my_pos`); queries, scans and record I/O come as default methods.
pub trait WireNode {
    /// The entity's own world position. Fixed for the entity's lifetime.
    fn my_pos(&self) -> Position;

    /// Number of slots.
    fn slot_count(&self) -> usize {
        1
    }

    /// Endpoint state of `slot`, `None` past the slot count.
    fn slot_at(&self, slot: SlotIndex) -> Option<NodeEndpoint>;

    /// Overwrite `slot`. Implementations must invalidate any cached view.
    fn set_slot(&mut self, slot: SlotIndex, endpoint: NodeEndpoint) -> Result<(), WireNetError>;

    /// Whether `slot` accepts energy.
    fn is_input(&self, _slot: SlotIndex) -> bool {
        true
    }

    /// Whether `slot` emits energy.
    fn is_output(&self, _slot: SlotIndex) -> bool {
        true
    }

    /// Open `slot`.
    fn remove_slot(&mut self, slot: SlotIndex) -> Result<(), WireNetError> {
        self.set_slot(slot, NodeEndpoint::open())
    }

    fn peer_position(&self, slot: SlotIndex) -> Option<Position> {
        self.slot_at(slot)?.peer().map(|p| p.pos)
    }

    fn wire_type(&self, slot: SlotIndex) -> Option<WireType> {
        self.slot_at(slot)?.peer().map(|p| p.wire)
    }

    fn peer_slot_index(&self, slot: SlotIndex) -> Option<SlotIndex> {
        self.slot_at(slot)?.peer().map(|p| p.slot)
    }

    fn is_connected(&self, slot: SlotIndex) -> bool {
        self.peer_position(slot).is_some()
    }

    /// Whether any slot links to `pos`.
    fn has_connection_to(&self, pos: Position) -> bool {
        self.find_connection_to(pos).is_some()
    }

    /// First slot (ascending) linked to `pos`.
    fn find_connection_to(&self, pos: Position) -> Option<SlotIndex> {
        (0..self.slot_count()).find(|&i| self.peer_position(i) == Some(pos))
    }

    /// First open slot in `from..to`, ascending. `to` is clamped to the slot count.
    fn find_open_slot(&self, from: SlotIndex, to: SlotIndex) -> Option<SlotIndex> {
        (from..to.min(self.slot_count())).find(|&i| !self.is_connected(i))
    }

    /// Indices of linked slots, ascending.
    fn connected_slots(&self) -> Cow<'_, [SlotIndex]> {
        Cow::Owned(
            (0..self.slot_count())
                .filter(|&i| self.is_connected(i))
                .collect(),
        )
    }

    /// Persist `slot` into `record`. Open slots write nothing.
    fn write_slot(&self, record: &mut NodeRecord, slot: SlotIndex) {
        if let Some(peer) = self.slot_at(slot).and_then(|ep| ep.peer()) {
            record::put_peer(record, slot, &peer);
        }
    }

    /// Restore `slot` from `record`.
    ///
    /// Returns `Ok(false)` and leaves the slot untouched when the record has
    /// no complete entry for `slot`.
    fn read_slot(&mut self, record: &NodeRecord, slot: SlotIndex) -> Result<bool, WireNetError> {
        match record::get_peer(record, slot) {
            Some(peer) => {
                self.set_slot(slot, NodeEndpoint::linked(peer.pos, peer.slot, peer.wire))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Persist every slot into a fresh record.
    fn write_all(&self) -> NodeRecord {
        let mut record = NodeRecord::new();
        for slot in 0..self.slot_count() {
            self.write_slot(&mut record, slot);
        }
        record
    }

    /// Restore every slot present in `record`. Returns the number restored.
    fn read_all(&mut self, record: &NodeRecord) -> Result<usize, WireNetError> {
        let mut restored = 0;
        for slot in 0..self.slot_count() {
            if self.read_slot(record, slot)? {
                restored += 1;
            }
        }
        Ok(restored)
    }
}

// =============================================================================
// TESTS
// =============================================================================

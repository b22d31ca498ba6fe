//! # Connection Protocol
//!
//! Connect, disconnect and lookup across two `WireNode`s resolved through a
//! `World`.
//!
//! Every link is written to both endpoints or to neither. Validation runs
//! before any write; the two writes are then committed as a pair, and if the
//! second side fails the first side is restored before the error is returned.
//!
//! Rejections are values (`ConnectResult`, `DisconnectResult`). The `Err` arm
//! of the returned `Result` is reserved for failures of the backing store.

use crate::node::{NodeEndpoint, WireNode};
use crate::primitives::MAX_LENGTH_SQ;
use crate::world::{Grid, World};
use crate::{EntityId, Position, SlotIndex, WireNetError, WireType};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// =============================================================================
// RESULTS
// =============================================================================

/// Outcome of a connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectResult {
    /// Missing or incapable entity on either side, both positions on the same
    /// entity, or a peer slot that neither receives nor emits.
    Invalid,
    /// Slot index negative or past the entity's slot count.
    Count,
    /// Span exceeds the protocol bound or the wire's own span.
    TooLong,
    /// The two entities are already linked.
    AlreadyExists,
    /// A target slot is already linked; disconnect it first.
    Occupied,
    /// Linked; the peer slot only receives.
    Input,
    /// Linked; the peer slot only emits.
    Output,
    /// Linked; the peer slot receives and emits.
    Bidirectional,
}

impl ConnectResult {
    /// Classify a link by the peer slot's capability flags.
    #[must_use]
    pub const fn link(input: bool, output: bool) -> Self {
        match (input, output) {
            (true, true) => Self::Bidirectional,
            (true, false) => Self::Input,
            (false, true) => Self::Output,
            (false, false) => Self::Invalid,
        }
    }

    /// Whether the link was established.
    #[must_use]
    pub const fn is_linked(self) -> bool {
        matches!(self, Self::Input | Self::Output | Self::Bidirectional)
    }
}

/// Outcome of a disconnect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectResult {
    /// Missing or incapable entity on either side, or both on the same entity.
    Invalid,
    /// No mirrored link between the two entities.
    NoConnection,
    /// Both sides cleared.
    Removed,
}

/// One side of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkEnd {
    pub pos: Position,
    pub slot: SlotIndex,
}

/// A link, reported once with `from < to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link {
    pub from: LinkEnd,
    pub to: LinkEnd,
    pub wire: WireType,
}

// =============================================================================
// CONNECTION SERVICE
// =============================================================================

/// Stateless protocol layer over a `World`.
pub struct ConnectionService;

impl ConnectionService {
    /// The wire capability of whatever occupies `pos`.
    ///
    /// `None` for an empty position or an entity without the capability.
    pub fn get_wire_node<W: World + ?Sized>(world: &W, pos: Position) -> Option<&dyn WireNode> {
        world.lookup(pos).and_then(|id| world.wire_node(id))
    }

    /// Link `slot_a` on the entity at `pos_a` with `slot_b` on the entity at
    /// `pos_b` using `wire`.
    ///
    /// Checks run in order: entities (`Invalid`), slot indices (`Count`),
    /// span (`TooLong`), existing link between the pair (`AlreadyExists`),
    /// target slots open (`Occupied`), peer slot direction (`Invalid`).
    /// Nothing is written unless every check passes.
    pub fn connect<W: World + ?Sized>(
        world: &mut W,
        pos_a: Position,
        slot_a: i32,
        pos_b: Position,
        slot_b: i32,
        wire: WireType,
    ) -> Result<ConnectResult, WireNetError> {
        let Some((id_a, id_b)) = resolve_pair(world, pos_a, pos_b) else {
            return Ok(ConnectResult::Invalid);
        };
        let (Some(node_a), Some(node_b)) = (world.wire_node(id_a), world.wire_node(id_b)) else {
            return Ok(ConnectResult::Invalid);
        };

        let (Some(slot_a), Some(slot_b)) = (
            checked_slot(node_a, slot_a),
            checked_slot(node_b, slot_b),
        ) else {
            return Ok(ConnectResult::Count);
        };

        let span_sq = pos_a.distance_sq(&pos_b);
        if span_sq > MAX_LENGTH_SQ || span_sq > wire.max_span_sq() {
            return Ok(ConnectResult::TooLong);
        }

        let (my_a, my_b) = (node_a.my_pos(), node_b.my_pos());
        if node_a.has_connection_to(my_b) {
            return Ok(ConnectResult::AlreadyExists);
        }
        if node_a.is_connected(slot_a) || node_b.is_connected(slot_b) {
            return Ok(ConnectResult::Occupied);
        }

        let kind = ConnectResult::link(node_b.is_input(slot_b), node_b.is_output(slot_b));
        if !kind.is_linked() {
            return Ok(kind);
        }

        commit_pair(
            world,
            (id_a, slot_a, NodeEndpoint::linked(my_b, slot_b, wire)),
            (id_b, slot_b, NodeEndpoint::linked(my_a, slot_a, wire)),
        )?;
        debug!(%my_a, slot_a, %my_b, slot_b, %wire, ?kind, "linked");
        Ok(kind)
    }

    /// Link the first open slot on each side.
    ///
    /// Returns `Count` when either side has no open slot.
    pub fn connect_auto<W: World + ?Sized>(
        world: &mut W,
        pos_a: Position,
        pos_b: Position,
        wire: WireType,
    ) -> Result<ConnectResult, WireNetError> {
        let Some((id_a, id_b)) = resolve_pair(world, pos_a, pos_b) else {
            return Ok(ConnectResult::Invalid);
        };
        let (Some(node_a), Some(node_b)) = (world.wire_node(id_a), world.wire_node(id_b)) else {
            return Ok(ConnectResult::Invalid);
        };
        let open = |node: &dyn WireNode| {
            node.find_open_slot(0, node.slot_count())
                .and_then(|slot| i32::try_from(slot).ok())
        };
        let (Some(slot_a), Some(slot_b)) = (open(node_a), open(node_b)) else {
            return Ok(ConnectResult::Count);
        };
        Self::connect(world, pos_a, slot_a, pos_b, slot_b, wire)
    }

    /// Remove the link between the entities at `pos_a` and `pos_b`.
    pub fn disconnect<W: World + ?Sized>(
        world: &mut W,
        pos_a: Position,
        pos_b: Position,
    ) -> Result<DisconnectResult, WireNetError> {
        let Some((id_a, id_b)) = resolve_pair(world, pos_a, pos_b) else {
            return Ok(DisconnectResult::Invalid);
        };
        let (Some(node_a), Some(node_b)) = (world.wire_node(id_a), world.wire_node(id_b)) else {
            return Ok(DisconnectResult::Invalid);
        };

        let (my_a, my_b) = (node_a.my_pos(), node_b.my_pos());
        let Some(slot_a) = node_a.find_connection_to(my_b) else {
            return Ok(DisconnectResult::NoConnection);
        };
        let Some(slot_b) = mirror_slot(node_a, slot_a, node_b) else {
            return Ok(DisconnectResult::NoConnection);
        };

        commit_pair(
            world,
            (id_a, slot_a, NodeEndpoint::open()),
            (id_b, slot_b, NodeEndpoint::open()),
        )?;
        debug!(%my_a, slot_a, %my_b, slot_b, "unlinked");
        Ok(DisconnectResult::Removed)
    }

    /// Wire type of the link from the entity at `pos_a` to `pos_b`.
    ///
    /// Only `pos_a` has to resolve; `pos_b` is matched against stored peer
    /// positions (through its owner's origin when it resolves).
    pub fn type_of_connection<W: World + ?Sized>(
        world: &W,
        pos_a: Position,
        pos_b: Position,
    ) -> Option<WireType> {
        let node_a = Self::get_wire_node(world, pos_a)?;
        let target = Self::get_wire_node(world, pos_b).map_or(pos_b, |b| b.my_pos());
        let slot = node_a.find_connection_to(target)?;
        node_a.wire_type(slot)
    }

    /// Clear every link of the entity at `pos`, on both sides.
    ///
    /// Used when the entity is removed. Slots whose peer does not mirror them
    /// are cleared on this side only. Returns the number of slots cleared.
    pub fn detach_all<W: World + ?Sized>(
        world: &mut W,
        pos: Position,
    ) -> Result<usize, WireNetError> {
        let Some(id) = world.lookup(pos) else {
            return Ok(0);
        };
        let Some(node) = world.wire_node(id) else {
            return Ok(0);
        };
        let my_pos = node.my_pos();
        let linked: Vec<(SlotIndex, Option<crate::node::Peer>)> = node
            .connected_slots()
            .iter()
            .map(|&slot| (slot, node.slot_at(slot).and_then(|ep| ep.peer())))
            .collect();

        let mut cleared = 0;
        for (slot, peer) in linked {
            let mirrored = peer.and_then(|peer| {
                let peer_id = world.lookup(peer.pos)?;
                let peer_node = world.wire_node(peer_id)?;
                (peer_id != id && peer_node.peer_position(peer.slot) == Some(my_pos))
                    .then_some((peer_id, peer.slot))
            });
            match mirrored {
                Some((peer_id, peer_slot)) => commit_pair(
                    world,
                    (id, slot, NodeEndpoint::open()),
                    (peer_id, peer_slot, NodeEndpoint::open()),
                )?,
                None => {
                    warn!(%my_pos, slot, "clearing one-sided link");
                    world
                        .wire_node_mut(id)
                        .ok_or(WireNetError::EntityNotFound(id))?
                        .remove_slot(slot)?;
                }
            }
            cleared += 1;
        }
        debug!(%my_pos, cleared, "detached");
        Ok(cleared)
    }

    /// Every link in the grid, once each, in order.
    #[must_use]
    pub fn links(grid: &Grid) -> Vec<Link> {
        let mut links = Vec::new();
        for node in grid.entities().filter_map(|e| e.as_wire_node()) {
            for &slot in node.connected_slots().iter() {
                let Some(peer) = node.slot_at(slot).and_then(|ep| ep.peer()) else {
                    continue;
                };
                let here = LinkEnd {
                    pos: node.my_pos(),
                    slot,
                };
                let there = LinkEnd {
                    pos: peer.pos,
                    slot: peer.slot,
                };
                if here < there {
                    links.push(Link {
                        from: here,
                        to: there,
                        wire: peer.wire,
                    });
                }
            }
        }
        links.sort();
        links
    }

    /// Linked slots whose peer does not point back with the same slot and wire.
    ///
    /// Empty for any grid mutated only through this service.
    #[must_use]
    pub fn dangling(grid: &Grid) -> Vec<LinkEnd> {
        let mut dangling = Vec::new();
        for node in grid.entities().filter_map(|e| e.as_wire_node()) {
            for &slot in node.connected_slots().iter() {
                let Some(peer) = node.slot_at(slot).and_then(|ep| ep.peer()) else {
                    continue;
                };
                let mirror = Self::get_wire_node(grid, peer.pos)
                    .filter(|p| p.my_pos() == peer.pos)
                    .and_then(|p| p.slot_at(peer.slot))
                    .and_then(|ep| ep.peer());
                let expected = crate::node::Peer {
                    pos: node.my_pos(),
                    slot,
                    wire: peer.wire,
                };
                if mirror != Some(expected) {
                    dangling.push(LinkEnd {
                        pos: node.my_pos(),
                        slot,
                    });
                }
            }
        }
        dangling
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Resolve two positions to two distinct entities.
fn resolve_pair<W: World + ?Sized>(
    world: &W,
    pos_a: Position,
    pos_b: Position,
) -> Option<(EntityId, EntityId)> {
    let id_a = world.lookup(pos_a)?;
    let id_b = world.lookup(pos_b)?;
    (id_a != id_b).then_some((id_a, id_b))
}

/// A caller-supplied slot index, if it addresses a slot of `node`.
fn checked_slot(node: &dyn WireNode, slot: i32) -> Option<SlotIndex> {
    SlotIndex::try_from(slot)
        .ok()
        .filter(|&s| s < node.slot_count())
}

/// The slot on `node_b` mirroring `slot_a` on `node_a`.
///
/// Prefers the recorded peer slot; falls back to a scan for `node_a`'s position.
fn mirror_slot(node_a: &dyn WireNode, slot_a: SlotIndex, node_b: &dyn WireNode) -> Option<SlotIndex> {
    let my_a = node_a.my_pos();
    node_a
        .peer_slot_index(slot_a)
        .filter(|&slot_b| node_b.peer_position(slot_b) == Some(my_a))
        .or_else(|| node_b.find_connection_to(my_a))
}

/// Write two endpoints as a pair, restoring the first if the second fails.
fn commit_pair<W: World + ?Sized>(
    world: &mut W,
    first: (EntityId, SlotIndex, NodeEndpoint),
    second: (EntityId, SlotIndex, NodeEndpoint),
) -> Result<(), WireNetError> {
    let (id_a, slot_a, endpoint_a) = first;
    let (id_b, slot_b, endpoint_b) = second;

    let node_a = world
        .wire_node_mut(id_a)
        .ok_or(WireNetError::EntityNotFound(id_a))?;
    let previous = node_a.slot_at(slot_a).ok_or(WireNetError::SlotOutOfRange {
        slot: slot_a,
        count: node_a.slot_count(),
    })?;
    node_a.set_slot(slot_a, endpoint_a)?;

    let written = match world.wire_node_mut(id_b) {
        Some(node_b) => node_b.set_slot(slot_b, endpoint_b),
        None => Err(WireNetError::EntityNotFound(id_b)),
    };

    if let Err(e) = written {
        warn!(entity = %id_a, slot = slot_a, error = %e, "second write failed, rolling back");
        if let Some(node_a) = world.wire_node_mut(id_a)
            && let Err(rollback) = node_a.set_slot(slot_a, previous)
        {
            warn!(entity = %id_a, slot = slot_a, error = %rollback, "rollback failed");
        }
        return Err(e);
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

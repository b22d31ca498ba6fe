//! # Drop Accounting
//!
//! When a wire-carrying entity is removed, each linked slot refunds one unit
//! of its wire type. Refunds are aggregated into one stack per wire type and
//! handed to external sinks.
//!
//! An actor holding spool tokens spends one token per slot to receive the
//! type's source drop instead of the plain drop. Stacks refunded to an actor
//! go to its inventory first; whatever does not fit is dropped in the world.

use crate::node::WireNode;
use crate::{Position, ResourceStack, WireType};
use serde::Serialize;
use tracing::debug;

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Receives stacks dropped into the world.
pub trait DropSink {
    fn drop_stack(&mut self, at: Position, stack: ResourceStack);
}

/// The inventory of the actor removing an entity.
pub trait Inventory {
    /// Spend one spool token. `false` when the actor has none left.
    fn take_token(&mut self) -> bool;

    /// Store a stack. Returns what did not fit.
    fn insert(&mut self, stack: ResourceStack) -> Option<ResourceStack>;
}

/// A sink that records every drop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DropLedger {
    pub drops: Vec<(Position, ResourceStack)>,
}

impl DropSink for DropLedger {
    fn drop_stack(&mut self, at: Position, stack: ResourceStack) {
        self.drops.push((at, stack));
    }
}

/// An inventory holding spool tokens and a bounded number of item units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Satchel {
    spools: u32,
    capacity: u32,
    held: Vec<ResourceStack>,
}

impl Satchel {
    #[must_use]
    pub fn new(spools: u32, capacity: u32) -> Self {
        Self {
            spools,
            capacity,
            held: Vec::new(),
        }
    }

    #[must_use]
    pub fn spools(&self) -> u32 {
        self.spools
    }

    #[must_use]
    pub fn held(&self) -> &[ResourceStack] {
        &self.held
    }

    fn free(&self) -> u32 {
        let used: u32 = self.held.iter().map(|s| s.count).sum();
        self.capacity.saturating_sub(used)
    }
}

impl Inventory for Satchel {
    fn take_token(&mut self) -> bool {
        if self.spools == 0 {
            return false;
        }
        self.spools -= 1;
        true
    }

    fn insert(&mut self, stack: ResourceStack) -> Option<ResourceStack> {
        let accepted = stack.count.min(self.free());
        if accepted > 0 {
            match self.held.iter_mut().find(|s| s.item == stack.item) {
                Some(existing) => existing.grow(accepted),
                None => self.held.push(ResourceStack::new(stack.item, accepted)),
            }
        }
        let rest = stack.count - accepted;
        (rest > 0).then(|| ResourceStack::new(stack.item, rest))
    }
}

// =============================================================================
// AGGREGATION
// =============================================================================

type Tally = [Option<ResourceStack>; WireType::COUNT];

fn add(tally: &mut Tally, wire: WireType, unit: ResourceStack) {
    tally[wire.index()]
        .get_or_insert(ResourceStack::new(unit.item, 0))
        .grow(unit.count);
}

fn linked_wires(node: &dyn WireNode) -> Vec<WireType> {
    node.connected_slots()
        .iter()
        .filter_map(|&slot| node.wire_type(slot))
        .collect()
}

/// One full-cost stack per wire type present on `node`, in catalog order.
#[must_use]
pub fn tally(node: &dyn WireNode) -> Vec<ResourceStack> {
    let mut tally: Tally = [None; WireType::COUNT];
    for wire in linked_wires(node) {
        add(&mut tally, wire, wire.drop_stack());
    }
    tally.into_iter().flatten().collect()
}

/// Drop the full-cost refund of every linked slot at the node's position.
pub fn drop_all(node: &dyn WireNode, sink: &mut dyn DropSink) {
    let at = node.my_pos();
    for stack in tally(node) {
        debug!(%at, item = stack.item, count = stack.count, "dropping wire");
        sink.drop_stack(at, stack);
    }
}

/// Refund every linked slot to `actor`.
///
/// Each slot spends at most one of the actor's tokens.
pub fn drop_all_for(node: &dyn WireNode, actor: &mut dyn Inventory, sink: &mut dyn DropSink) {
    let mut refunded: Tally = [None; WireType::COUNT];
    let mut full: Tally = [None; WireType::COUNT];
    for wire in linked_wires(node) {
        if actor.take_token() {
            add(&mut refunded, wire, wire.source_drop());
        } else {
            add(&mut full, wire, wire.drop_stack());
        }
    }

    let at = node.my_pos();
    for stack in refunded.into_iter().chain(full).flatten() {
        if let Some(rest) = actor.insert(stack).filter(|s| !s.is_empty()) {
            debug!(%at, item = rest.item, count = rest.count, "inventory full, dropping");
            sink.drop_stack(at, rest);
        }
    }
}

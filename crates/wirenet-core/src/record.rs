//! # Persistence Record
//!
//! The flat key/value record an entity's slots are persisted into by the
//! surrounding persistence layer.
//!
//! Slot `n` uses the keys `x{n}`, `y{n}`, `z{n}` (peer position), `node{n}`
//! (peer slot) and `type{n}` (wire index). Only linked slots are written.
//! A slot is restorable when all three position keys and the type key are
//! present; a missing `node{n}` reads as slot 0.

use crate::node::Peer;
use crate::primitives::{KEY_NODE, KEY_TYPE, KEY_X, KEY_Y, KEY_Z};
use crate::{Position, SlotIndex, WireType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A flat string-keyed integer record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeRecord {
    values: BTreeMap<String, i32>,
}

impl NodeRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_int(&mut self, key: impl Into<String>, value: i32) {
        self.values.insert(key.into(), value);
    }

    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i32> {
        self.values.get(key).copied()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<i32> {
        self.values.remove(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

fn key(prefix: &str, slot: SlotIndex) -> String {
    format!("{prefix}{slot}")
}

/// All three position keys are present for `slot`.
#[must_use]
pub fn has_pos(record: &NodeRecord, slot: SlotIndex) -> bool {
    [KEY_X, KEY_Y, KEY_Z]
        .iter()
        .all(|prefix| record.contains(&key(prefix, slot)))
}

/// Position keys and the type key are present for `slot`.
#[must_use]
pub fn has_node(record: &NodeRecord, slot: SlotIndex) -> bool {
    has_pos(record, slot) && record.contains(&key(KEY_TYPE, slot))
}

/// Remove every persisted field of `slot`.
pub fn clear_slot(record: &mut NodeRecord, slot: SlotIndex) {
    for prefix in [KEY_X, KEY_Y, KEY_Z, KEY_NODE, KEY_TYPE] {
        record.remove(&key(prefix, slot));
    }
}

pub(crate) fn put_peer(record: &mut NodeRecord, slot: SlotIndex, peer: &Peer) {
    record.put_int(key(KEY_X, slot), peer.pos.x);
    record.put_int(key(KEY_Y, slot), peer.pos.y);
    record.put_int(key(KEY_Z, slot), peer.pos.z);
    record.put_int(
        key(KEY_NODE, slot),
        i32::try_from(peer.slot).unwrap_or(i32::MAX),
    );
    record.put_int(key(KEY_TYPE, slot), wire_index(peer.wire));
}

/// Decode `slot`. `None` when incomplete, when the wire index is not in the
/// catalog, or when the peer slot is negative.
pub(crate) fn get_peer(record: &NodeRecord, slot: SlotIndex) -> Option<Peer> {
    if !has_node(record, slot) {
        return None;
    }
    let pos = Position::new(
        record.get_int(&key(KEY_X, slot))?,
        record.get_int(&key(KEY_Y, slot))?,
        record.get_int(&key(KEY_Z, slot))?,
    );
    let wire = WireType::from_index(record.get_int(&key(KEY_TYPE, slot))?)?;
    let peer_slot = record.get_int(&key(KEY_NODE, slot)).unwrap_or(0);
    let peer_slot = SlotIndex::try_from(peer_slot).ok()?;
    Some(Peer {
        pos,
        slot: peer_slot,
        wire,
    })
}

fn wire_index(wire: WireType) -> i32 {
    i32::try_from(wire.index()).unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_peer() -> Peer {
        Peer {
            pos: Position::new(10, -64, 3),
            slot: 5,
            wire: WireType::Gold,
        }
    }

    #[test]
    fn put_peer_uses_indexed_keys() {
        let mut record = NodeRecord::new();
        put_peer(&mut record, 3, &sample_peer());

        assert_eq!(record.get_int("x3"), Some(10));
        assert_eq!(record.get_int("y3"), Some(-64));
        assert_eq!(record.get_int("z3"), Some(3));
        assert_eq!(record.get_int("node3"), Some(5));
        assert_eq!(record.get_int("type3"), Some(1));
        assert_eq!(record.len(), 5);
    }

    #[test]
    fn get_peer_roundtrip() {
        let mut record = NodeRecord::new();
        put_peer(&mut record, 0, &sample_peer());
        assert_eq!(get_peer(&record, 0), Some(sample_peer()));
        assert_eq!(get_peer(&record, 1), None);
    }

    #[test]
    fn missing_field_is_skipped() {
        for missing in ["x0", "y0", "z0", "type0"] {
            let mut record = NodeRecord::new();
            put_peer(&mut record, 0, &sample_peer());
            record.remove(missing);
            assert!(!has_node(&record, 0), "missing {missing}");
            assert_eq!(get_peer(&record, 0), None, "missing {missing}");
        }
    }

    #[test]
    fn missing_node_key_reads_as_zero() {
        let mut record = NodeRecord::new();
        put_peer(&mut record, 0, &sample_peer());
        record.remove("node0");
        assert_eq!(get_peer(&record, 0).map(|p| p.slot), Some(0));
    }

    #[test]
    fn unknown_type_or_negative_node_is_skipped() {
        let mut record = NodeRecord::new();
        put_peer(&mut record, 0, &sample_peer());
        record.put_int("type0", 99);
        assert_eq!(get_peer(&record, 0), None);

        let mut record = NodeRecord::new();
        put_peer(&mut record, 0, &sample_peer());
        record.put_int("node0", -1);
        assert_eq!(get_peer(&record, 0), None);
    }

    #[test]
    fn has_pos_without_type() {
        let mut record = NodeRecord::new();
        record.put_int("x2", 0);
        record.put_int("y2", 0);
        record.put_int("z2", 0);
        assert!(has_pos(&record, 2));
        assert!(!has_node(&record, 2));
    }

    #[test]
    fn clear_slot_removes_all_fields() {
        let mut record = NodeRecord::new();
        put_peer(&mut record, 1, &sample_peer());
        put_peer(&mut record, 2, &sample_peer());

        clear_slot(&mut record, 1);

        assert!(!has_node(&record, 1));
        assert!(!record.contains("node1"));
        assert!(has_node(&record, 2));
        assert_eq!(record.len(), 5);

        // Idempotent
        clear_slot(&mut record, 1);
        assert_eq!(record.len(), 5);
    }
}

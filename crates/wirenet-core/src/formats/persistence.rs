//! # Snapshot Format
//!
//! Binary serialization for whole worlds.
//!
//! Format: Header (5 bytes) + postcard-serialized world rows.
//! - 4 bytes: Magic ("WNET")
//! - 1 byte: Version
//!
//! Each entity is stored as a row of id, kind, origin and its slot record
//! (see `record`). Slots are restored through `WireNode::read_all`, so the
//! snapshot and the per-entity record share a single encoding.
//!
//! File I/O operations are in the app layer.

use crate::entity::{Entity, EntityKind};
use crate::record::NodeRecord;
use crate::world::Grid;
use crate::{EntityId, Position, WireNetError, primitives};
use serde::{Deserialize, Serialize};

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum accepted snapshot size, validated before deserialization.
pub const MAX_SNAPSHOT_SIZE: usize = 256 * 1024 * 1024; // 256 MB

const HEADER_SIZE: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The snapshot header precedes all world data.
#[derive(Debug, Clone, Copy)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Create a new header with current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), WireNetError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(WireNetError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(WireNetError::DeserializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireNetError> {
        let Some(header) = bytes.get(..HEADER_SIZE) else {
            return Err(WireNetError::DeserializationError(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[0..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ROWS
// =============================================================================

/// One persisted entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRow {
    pub id: EntityId,
    pub kind: EntityKind,
    pub origin: Position,
    pub record: NodeRecord,
}

impl EntityRow {
    /// Capture an entity and its slots.
    #[must_use]
    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            id: entity.id(),
            kind: entity.kind(),
            origin: entity.origin(),
            record: entity
                .as_wire_node()
                .map(|node| node.write_all())
                .unwrap_or_default(),
        }
    }

    /// Rebuild the entity, restoring every complete slot entry.
    pub fn into_entity(self) -> Result<Entity, WireNetError> {
        let mut entity = Entity::new(self.id, self.kind, self.origin);
        if let Some(node) = entity.as_wire_node_mut() {
            node.read_all(&self.record)?;
        }
        Ok(entity)
    }
}

/// A whole world in serializable form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableWorld {
    pub next_entity_id: u64,
    pub entities: Vec<EntityRow>,
}

impl From<&Grid> for SerializableWorld {
    fn from(grid: &Grid) -> Self {
        Self {
            next_entity_id: grid.next_entity_id(),
            entities: grid.entities().map(EntityRow::from_entity).collect(),
        }
    }
}

impl TryFrom<SerializableWorld> for Grid {
    type Error = WireNetError;

    fn try_from(world: SerializableWorld) -> Result<Self, Self::Error> {
        let mut grid = Grid::new();
        for row in world.entities {
            grid.insert(row.into_entity()?)?;
        }
        grid.reserve_ids(world.next_entity_id);
        Ok(grid)
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a world to bytes (header + payload).
///
/// This is a pure transformation - no file I/O.
pub fn world_to_bytes(grid: &Grid) -> Result<Vec<u8>, WireNetError> {
    let header = PersistenceHeader::new();
    let serializable = SerializableWorld::from(grid);

    let payload = postcard::to_stdvec(&serializable)
        .map_err(|e| WireNetError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);

    Ok(result)
}

/// Deserialize a world from bytes.
///
/// Size and header are validated before the payload is parsed.
pub fn world_from_bytes(bytes: &[u8]) -> Result<Grid, WireNetError> {
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(WireNetError::DeserializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = &bytes[HEADER_SIZE..];
    let serializable: SerializableWorld = postcard::from_bytes(payload).map_err(|e| {
        WireNetError::DeserializationError(format!("Failed to deserialize world data: {}", e))
    })?;

    Grid::try_from(serializable)
}

/// Deterministic 64-bit FNV-1a checksum of the world's snapshot bytes.
pub fn world_checksum(grid: &Grid) -> Result<u64, WireNetError> {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let bytes = world_to_bytes(grid)?;
    Ok(bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(PRIME)))
}

/// BLAKE3 digest of the world's snapshot bytes, hex encoded.
#[cfg(feature = "crypto-hash")]
pub fn world_crypto_hash(grid: &Grid) -> Result<String, WireNetError> {
    let bytes = world_to_bytes(grid)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionService;
    use crate::WireType;

    fn linked_world() -> Grid {
        let mut grid = Grid::new();
        let a = Position::new(0, 64, 0);
        let b = Position::new(4, 64, 0);
        let c = Position::new(4, 64, 4);
        grid.place(EntityKind::SmallConnector, a).expect("place");
        grid.place(EntityKind::Accumulator, b).expect("place");
        grid.place(EntityKind::Block, c).expect("place");
        ConnectionService::connect(&mut grid, a, 1, b, 6, WireType::Gold).expect("connect");
        grid
    }

    #[test]
    fn header_roundtrip() {
        let header = PersistenceHeader::new();
        let bytes = header.to_bytes();
        let restored = PersistenceHeader::from_bytes(&bytes).expect("parse header");

        assert_eq!(restored.magic, *primitives::MAGIC_BYTES);
        assert_eq!(restored.version, primitives::FORMAT_VERSION);
    }

    #[test]
    fn bytes_roundtrip_bit_exact() {
        let grid = linked_world();

        let bytes1 = world_to_bytes(&grid).expect("first serialize");
        let restored = world_from_bytes(&bytes1).expect("deserialize");
        let bytes2 = world_to_bytes(&restored).expect("second serialize");

        assert_eq!(
            bytes1, bytes2,
            "save -> load -> save must produce identical bytes"
        );
        assert_eq!(restored.link_count(), 1);
        assert!(ConnectionService::dangling(&restored).is_empty());
        assert_eq!(restored.next_entity_id(), grid.next_entity_id());
    }

    #[test]
    fn roundtrip_preserves_entities() {
        let grid = linked_world();
        let restored = world_from_bytes(&world_to_bytes(&grid).expect("ser")).expect("de");
        let before: Vec<_> = grid.entities().cloned().collect();
        let after: Vec<_> = restored.entities().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = vec![0u8; 10];
        bytes[0..4].copy_from_slice(b"XXXX");
        assert!(world_from_bytes(&bytes).is_err());
    }

    #[test]
    fn short_input_rejected() {
        assert!(world_from_bytes(b"WNE").is_err());
    }

    #[test]
    fn checksum_deterministic() {
        let grid = linked_world();
        let first = world_checksum(&grid).expect("checksum");
        assert_eq!(first, world_checksum(&grid).expect("checksum"));
        assert_ne!(first, world_checksum(&Grid::new()).expect("checksum"));
    }
}

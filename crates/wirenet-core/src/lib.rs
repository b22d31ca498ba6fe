//! # wirenet-core
//!
//! Point-to-point wire links between block entities in a voxel world.
//!
//! Entities that can carry wires expose a fixed number of connection slots.
//! Each slot is either open or linked to one slot on a peer entity. Links
//! are symmetric: the peer's slot always points back.
//!
//! ## Layout
//!
//! - `node`: slot storage and the `WireNode` capability
//! - `record`: the sparse per-slot key/value record
//! - `connection`: the connect/disconnect protocol over a `World`
//! - `drops`: refunds for linked slots when an entity is removed
//! - `formats` / `storage`: snapshots and the redb store
//!
//! The crate has no async and no network dependencies. All geometry is
//! integer arithmetic.

// =============================================================================
// MODULES
// =============================================================================

pub mod connection;
pub mod drops;
pub mod entity;
pub mod formats;
pub mod node;
pub mod primitives;
pub mod record;
pub mod storage;
pub mod types;
pub mod wire_type;
pub mod world;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{EntityId, Position, ResourceStack, SlotIndex, WireNetError};
pub use wire_type::WireType;

// =============================================================================
// RE-EXPORTS: Wire Model
// =============================================================================

pub use connection::{ConnectResult, ConnectionService, DisconnectResult, Link, LinkEnd};
pub use drops::{DropLedger, DropSink, Inventory, Satchel, drop_all, drop_all_for, tally};
pub use entity::{Connector, Entity, EntityKind};
pub use node::{NodeEndpoint, Peer, Slots, WireNode};
pub use record::NodeRecord;
pub use world::{Grid, World};

// =============================================================================
// RE-EXPORTS: Persistence
// =============================================================================

pub use formats::{PersistenceHeader, world_checksum, world_from_bytes, world_to_bytes};
pub use storage::RedbWorld;

//! # Serialization Formats
//!
//! Pure byte-level transformations; file I/O lives in the app layer.

pub mod persistence;

pub use persistence::{
    EntityRow, MAX_SNAPSHOT_SIZE, PersistenceHeader, SerializableWorld, world_checksum,
    world_from_bytes, world_to_bytes,
};

#[cfg(feature = "crypto-hash")]
pub use persistence::world_crypto_hash;

//! # Storage
//!
//! Disk-backed world persistence.

pub mod redb_world;

pub use redb_world::RedbWorld;

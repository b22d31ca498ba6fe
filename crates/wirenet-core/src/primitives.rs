//! # Protocol Primitives
//!
//! Hardcoded constants for the Wirenet CORE.
//!
//! These are compiled into the binary and are immutable at runtime.

/// Maximum straight-line span of any link, in world units.
///
/// Protocol-wide bound, independent of the wire type's own span.
/// A link is rejected when `distance_sq > MAX_LENGTH * MAX_LENGTH`,
/// so a span of exactly `MAX_LENGTH` is accepted.
pub const MAX_LENGTH: i64 = 12;

/// Squared form of [`MAX_LENGTH`], the value actually compared against.
pub const MAX_LENGTH_SQ: i64 = MAX_LENGTH * MAX_LENGTH;

/// Upper bound on the number of connection slots a single entity may own.
pub const MAX_NODES: usize = 8;

/// Magic bytes for the Wirenet snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"WNET";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// PERSISTENCE RECORD KEYS
// =============================================================================

/// Key prefix of the peer x coordinate for slot `n` (`x{n}`).
pub const KEY_X: &str = "x";
/// Key prefix of the peer y coordinate for slot `n` (`y{n}`).
pub const KEY_Y: &str = "y";
/// Key prefix of the peer z coordinate for slot `n` (`z{n}`).
pub const KEY_Z: &str = "z";
/// Key prefix of the peer slot index for slot `n` (`node{n}`).
pub const KEY_NODE: &str = "node";
/// Key prefix of the wire type index for slot `n` (`type{n}`).
pub const KEY_TYPE: &str = "type";

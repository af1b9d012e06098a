//! Type-tagged CRDT lattice values.
//!
//! Every stored value is a pair of a [`LatticeType`] tag and an encoded
//! merge state. The tag is fixed by the first successful write to a key and
//! is immutable afterwards; all merge, encode, and decode logic is owned by
//! the per-type codec registry so the store itself never branches on tags.
//!
//! - [`values`] - concrete lattice value types (LWW, sets, counter)
//! - [`registry`] - the per-type merge/encode/decode registry
//! - [`store`] - the keyed store enforcing the write-once tag invariant

pub mod registry;
pub mod store;
pub mod values;

use serde::{Deserialize, Serialize};

/// Conflict-resolution type tag for a stored value.
///
/// `None` is the absent sentinel: it is never a valid tag for a put and a
/// stored record never carries it after a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LatticeType {
    /// Absent / untyped.
    #[default]
    None,
    /// Last-writer-wins register ordered by (timestamp, value bytes).
    Lww,
    /// Unordered set under union.
    Set,
    /// Ordered set under union.
    OrderedSet,
    /// Grow-only counter keyed by writer id.
    Counter,
}

impl LatticeType {
    /// All tags that carry a codec (everything except `None`).
    pub const MERGEABLE: [LatticeType; 4] = [
        LatticeType::Lww,
        LatticeType::Set,
        LatticeType::OrderedSet,
        LatticeType::Counter,
    ];

    /// Whether this tag denotes an actual lattice (not the absent sentinel).
    pub fn is_typed(&self) -> bool {
        !matches!(self, LatticeType::None)
    }
}

impl std::fmt::Display for LatticeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Lww => write!(f, "LWW"),
            Self::Set => write!(f, "SET"),
            Self::OrderedSet => write!(f, "ORDERED_SET"),
            Self::Counter => write!(f, "COUNTER"),
        }
    }
}

//! Keyed store of type-tagged lattice values.
//!
//! Each worker task owns one store exclusively; there is no interior
//! locking. The store enforces exactly one invariant itself, the
//! write-once type tag, and delegates every merge to the codec registry.

use crate::core::error::{StrataError, StrataResult};
use crate::lattice::registry::{LatticeRegistry, MergeOutcome};
use crate::lattice::LatticeType;
use crate::protocol::Key;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};

/// A stored value: its immutable type tag and the encoding of the merge
/// state accumulated so far.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    lattice_type: LatticeType,
    payload: Bytes,
}

impl StoredValue {
    pub fn lattice_type(&self) -> LatticeType {
        self.lattice_type
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

/// Per-worker lattice store with a dirty-key changeset.
#[derive(Debug, Default)]
pub struct LatticeStore {
    entries: HashMap<Key, StoredValue>,
    changeset: HashSet<Key>,
}

impl LatticeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored value for `key`. Absence means the key has never seen a
    /// successful typed write.
    pub fn get(&self, key: &str) -> Option<&StoredValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total stored payload bytes across all keys.
    pub fn payload_bytes(&self) -> usize {
        self.entries.values().map(|v| v.payload.len()).sum()
    }

    /// Merge `payload` into `key` under the write-once tag invariant.
    ///
    /// Rejects untyped puts (`MissingLatticeType`) and tag conflicts
    /// (`LatticeTypeMismatch`) without mutating state; decode and codec
    /// errors also leave the stored value untouched. A merge that changes
    /// the stored value marks the key in the changeset for the next
    /// propagation cycle; a put the value had already absorbed leaves no
    /// mark, so replicas pushing the same state at each other go quiet.
    pub fn put(
        &mut self,
        key: &str,
        lattice: LatticeType,
        payload: &[u8],
        registry: &LatticeRegistry,
    ) -> StrataResult<()> {
        if !lattice.is_typed() {
            return Err(StrataError::missing_type(key));
        }
        let current = self.entries.get(key);
        if let Some(stored) = current {
            if stored.lattice_type != lattice {
                return Err(StrataError::type_mismatch(
                    key,
                    stored.lattice_type,
                    lattice,
                ));
            }
        }
        let codec = registry.codec(lattice)?;
        match codec.merge(current.map(|v| v.payload.as_ref()), payload)? {
            MergeOutcome::Updated(merged) => {
                self.entries.insert(
                    key.to_string(),
                    StoredValue {
                        lattice_type: lattice,
                        payload: merged,
                    },
                );
                self.changeset.insert(key.to_string());
            }
            MergeOutcome::Unchanged => {}
        }
        Ok(())
    }

    /// Re-mark a key for the next propagation cycle.
    pub fn mark_dirty(&mut self, key: &str) {
        self.changeset.insert(key.to_string());
    }

    /// Drain the set of keys mutated since the last call.
    pub fn take_changeset(&mut self) -> HashSet<Key> {
        std::mem::take(&mut self.changeset)
    }

    /// Drop every entry and pending changeset mark. Returns the number of
    /// entries dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        self.changeset.clear();
        dropped
    }
}

//! Concrete lattice value types.
//!
//! Each type wraps a lattice from the `lattices` crate and exposes a small
//! domain API on top of it. Merging always goes through `lattices::Merge`,
//! so commutativity, associativity, and idempotence come from the wrapped
//! lattice rather than hand-rolled combine logic.
//!
//! On the wire every value travels as its bincode encoding; the helpers at
//! the bottom wrap bincode with typed errors.

use crate::core::error::{StrataError, StrataResult};
use crate::lattice::LatticeType;
use bytes::Bytes;
use lattices::map_union::MapUnionBTreeMap;
use lattices::set_union::{SetUnionBTreeSet, SetUnionHashSet};
use lattices::{Max, Merge};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Last writer wins register: a timestamped byte string.
///
/// Merge keeps the pair with the greater (timestamp, bytes) ordering, so
/// timestamp ties break deterministically on the value bytes and every
/// replica converges to the same winner.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LwwValue {
    inner: Max<(u64, Vec<u8>)>,
}

impl LwwValue {
    pub fn new(timestamp: u64, value: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: Max::new((timestamp, value.into())),
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.inner.as_reveal_ref().0
    }

    pub fn value(&self) -> &[u8] {
        &self.inner.as_reveal_ref().1
    }
}

impl Merge<LwwValue> for LwwValue {
    fn merge(&mut self, other: LwwValue) -> bool {
        self.inner.merge(other.inner)
    }
}

/// Unordered grow-only set of byte strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SetValue {
    inner: SetUnionHashSet<Vec<u8>>,
}

impl SetValue {
    pub fn new(elements: HashSet<Vec<u8>>) -> Self {
        Self {
            inner: SetUnionHashSet::new(elements),
        }
    }

    pub fn singleton(element: impl Into<Vec<u8>>) -> Self {
        let mut elements = HashSet::new();
        elements.insert(element.into());
        Self::new(elements)
    }

    pub fn elements(&self) -> &HashSet<Vec<u8>> {
        self.inner.as_reveal_ref()
    }

    pub fn contains(&self, element: &[u8]) -> bool {
        self.elements().contains(element)
    }

    pub fn len(&self) -> usize {
        self.elements().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements().is_empty()
    }
}

impl Merge<SetValue> for SetValue {
    fn merge(&mut self, other: SetValue) -> bool {
        self.inner.merge(other.inner)
    }
}

/// Ordered grow-only set of byte strings. Iteration and encoding follow
/// the element ordering, so equal sets encode to equal bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderedSetValue {
    inner: SetUnionBTreeSet<Vec<u8>>,
}

impl OrderedSetValue {
    pub fn new(elements: BTreeSet<Vec<u8>>) -> Self {
        Self {
            inner: SetUnionBTreeSet::new(elements),
        }
    }

    pub fn singleton(element: impl Into<Vec<u8>>) -> Self {
        let mut elements = BTreeSet::new();
        elements.insert(element.into());
        Self::new(elements)
    }

    pub fn elements(&self) -> &BTreeSet<Vec<u8>> {
        self.inner.as_reveal_ref()
    }

    pub fn len(&self) -> usize {
        self.elements().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements().is_empty()
    }
}

impl Merge<OrderedSetValue> for OrderedSetValue {
    fn merge(&mut self, other: OrderedSetValue) -> bool {
        self.inner.merge(other.inner)
    }
}

/// Grow-only counter: each writer publishes its own monotone count and
/// the observed value is the sum over writers. Merge takes the per-writer
/// maximum, so replayed or reordered updates never double count.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CounterValue {
    inner: MapUnionBTreeMap<String, Max<u64>>,
}

impl CounterValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise `writer`'s published count to at least `count`.
    pub fn record(&mut self, writer: impl Into<String>, count: u64) {
        let writer = writer.into();
        let map = self.inner.as_reveal_mut();
        match map.get_mut(&writer) {
            Some(current) => {
                current.merge(Max::new(count));
            }
            None => {
                map.insert(writer, Max::new(count));
            }
        }
    }

    /// Increment `writer`'s published count by `delta`.
    pub fn bump(&mut self, writer: impl Into<String>, delta: u64) {
        let writer = writer.into();
        let current = self.count_for(&writer);
        self.record(writer, current.saturating_add(delta));
    }

    /// `writer`'s published count, zero if it never wrote.
    pub fn count_for(&self, writer: &str) -> u64 {
        self.inner
            .as_reveal_ref()
            .get(writer)
            .map(|max| max.into_reveal())
            .unwrap_or(0)
    }

    /// The counter's observed value.
    pub fn total(&self) -> u64 {
        self.inner
            .as_reveal_ref()
            .values()
            .map(|max| max.into_reveal())
            .sum()
    }
}

impl Merge<CounterValue> for CounterValue {
    fn merge(&mut self, other: CounterValue) -> bool {
        self.inner.merge(other.inner)
    }
}

/// Encode a lattice value for the wire.
pub fn encode<T: Serialize>(value: &T, lattice: LatticeType) -> StrataResult<Bytes> {
    let bytes = bincode::serialize(value).map_err(|source| StrataError::PayloadEncode {
        lattice,
        source,
    })?;
    Ok(Bytes::from(bytes))
}

/// Decode a lattice value from wire bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8], lattice: LatticeType) -> StrataResult<T> {
    bincode::deserialize(bytes).map_err(|source| StrataError::PayloadDecode { lattice, source })
}

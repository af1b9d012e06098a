//! Per-type merge and codec registry.
//!
//! The store never branches on lattice type tags. Everything type-specific
//! lives behind [`LatticeCodec`], and the registry maps each tag to one
//! codec at startup. Supporting a new lattice type means registering a new
//! codec, not touching store or processor logic.

use crate::core::error::{StrataError, StrataResult};
use crate::lattice::values::{self, CounterValue, LwwValue, OrderedSetValue, SetValue};
use crate::lattice::LatticeType;
use bytes::Bytes;
use lattices::Merge;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::marker::PhantomData;

/// Result of merging an incoming payload into a stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The merge changed the value; this is its new encoding.
    Updated(Bytes),
    /// The stored value had already absorbed the incoming one.
    Unchanged,
}

/// Merge behavior over encoded payloads for one lattice type.
pub trait LatticeCodec: Send + Sync {
    /// Merge `incoming` into `current`. `current` is `None` on the first
    /// write to a key, which always counts as a change.
    fn merge(&self, current: Option<&[u8]>, incoming: &[u8]) -> StrataResult<MergeOutcome>;

    /// Check that `payload` decodes as this type.
    fn validate(&self, payload: &[u8]) -> StrataResult<()>;
}

/// [`LatticeCodec`] for any serde-encodable lattice value.
struct SerdeCodec<T> {
    lattice: LatticeType,
    _value: PhantomData<fn() -> T>,
}

impl<T> SerdeCodec<T> {
    fn new(lattice: LatticeType) -> Self {
        Self {
            lattice,
            _value: PhantomData,
        }
    }
}

impl<T> LatticeCodec for SerdeCodec<T>
where
    T: Merge<T> + Serialize + DeserializeOwned,
{
    fn merge(&self, current: Option<&[u8]>, incoming: &[u8]) -> StrataResult<MergeOutcome> {
        let incoming: T = values::decode(incoming, self.lattice)?;
        match current {
            Some(bytes) => {
                let mut value: T = values::decode(bytes, self.lattice)?;
                if value.merge(incoming) {
                    Ok(MergeOutcome::Updated(values::encode(&value, self.lattice)?))
                } else {
                    Ok(MergeOutcome::Unchanged)
                }
            }
            None => values::encode(&incoming, self.lattice).map(MergeOutcome::Updated),
        }
    }

    fn validate(&self, payload: &[u8]) -> StrataResult<()> {
        values::decode::<T>(payload, self.lattice).map(|_| ())
    }
}

/// Registry mapping lattice type tags to their codecs.
pub struct LatticeRegistry {
    codecs: HashMap<LatticeType, Box<dyn LatticeCodec>>,
}

impl LatticeRegistry {
    /// An empty registry. Most callers want [`LatticeRegistry::standard`].
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// The built-in catalog: LWW, SET, ORDERED_SET, and COUNTER.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register::<LwwValue>(LatticeType::Lww);
        registry.register::<SetValue>(LatticeType::Set);
        registry.register::<OrderedSetValue>(LatticeType::OrderedSet);
        registry.register::<CounterValue>(LatticeType::Counter);
        registry
    }

    /// Register the serde codec for `lattice` backed by `T`. Replaces any
    /// previous codec for the same tag.
    pub fn register<T>(&mut self, lattice: LatticeType)
    where
        T: Merge<T> + Serialize + DeserializeOwned + 'static,
    {
        self.codecs
            .insert(lattice, Box::new(SerdeCodec::<T>::new(lattice)));
    }

    /// Register a hand-written codec for `lattice`.
    pub fn register_codec(&mut self, lattice: LatticeType, codec: Box<dyn LatticeCodec>) {
        self.codecs.insert(lattice, codec);
    }

    pub fn supports(&self, lattice: LatticeType) -> bool {
        self.codecs.contains_key(&lattice)
    }

    /// The codec for `lattice`, or `UnknownLatticeType`.
    pub fn codec(&self, lattice: LatticeType) -> StrataResult<&dyn LatticeCodec> {
        self.codecs
            .get(&lattice)
            .map(|codec| codec.as_ref())
            .ok_or(StrataError::UnknownLatticeType(lattice))
    }
}

impl Default for LatticeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

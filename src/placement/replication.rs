//! Per-key replication factors.
//!
//! Every data key has a cross-node replication count per tier and a
//! per-node thread count per tier. Factors are fetched on demand from the
//! owner of the key's replication metadata and cached here; a key whose
//! factors are not cached cannot be resolved until the fetch answer
//! arrives. The map also tracks which fetches are in flight so repeated
//! lookups for the same key issue exactly one fetch.

use crate::placement::tier::Tier;
use crate::protocol::{KeyReplication, TierFactor};
use std::collections::{HashMap, HashSet};

/// Replication factors for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicationFactor {
    global: HashMap<Tier, u32>,
    local: HashMap<Tier, u32>,
}

impl ReplicationFactor {
    /// Factors with an explicit global count per tier and one owning
    /// thread per node on every tier.
    pub fn with_global(counts: &[(Tier, u32)]) -> Self {
        let mut factor = Self {
            global: HashMap::new(),
            local: HashMap::new(),
        };
        for &(tier, value) in counts {
            factor.global.insert(tier, value);
        }
        factor
    }

    /// The fixed factor for cluster metadata keys: a single replica on the
    /// metadata tier, owned by a single thread.
    pub fn metadata() -> Self {
        Self::with_global(&[(Tier::METADATA, 1)])
    }

    /// Cross-node replica count on `tier`. Tiers without an explicit
    /// count hold no replicas.
    pub fn global(&self, tier: Tier) -> u32 {
        self.global.get(&tier).copied().unwrap_or(0)
    }

    /// Owning thread count per node on `tier`. Tiers without an explicit
    /// count default to one thread, so a node is never responsible with
    /// zero owning threads.
    pub fn local(&self, tier: Tier) -> u32 {
        self.local.get(&tier).copied().unwrap_or(1)
    }

    pub fn set_global(&mut self, tier: Tier, value: u32) {
        self.global.insert(tier, value);
    }

    pub fn set_local(&mut self, tier: Tier, value: u32) {
        self.local.insert(tier, value);
    }

    /// Total replica count across all tiers.
    pub fn total_global(&self) -> u32 {
        Tier::ALL.iter().map(|&t| self.global(t)).sum()
    }

    /// Convert from the wire shape carried by factor updates.
    pub fn from_wire(rep: &KeyReplication) -> Self {
        let mut factor = Self {
            global: HashMap::new(),
            local: HashMap::new(),
        };
        for TierFactor { tier, value } in &rep.global {
            factor.global.insert(*tier, *value);
        }
        for TierFactor { tier, value } in &rep.local {
            factor.local.insert(*tier, *value);
        }
        factor
    }

    /// Convert to the wire shape for factor updates.
    pub fn to_wire(&self, key: impl Into<String>) -> KeyReplication {
        let encode = |map: &HashMap<Tier, u32>| {
            let mut factors: Vec<TierFactor> = map
                .iter()
                .map(|(&tier, &value)| TierFactor { tier, value })
                .collect();
            factors.sort_by_key(|f| f.tier);
            factors
        };
        KeyReplication {
            key: key.into(),
            global: encode(&self.global),
            local: encode(&self.local),
        }
    }
}

/// Outcome of a factor lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorLookup {
    /// Factors are cached; resolution can proceed.
    Known,
    /// Factors are missing and this lookup is the first since they went
    /// missing; the caller must issue a fetch.
    FetchNeeded,
    /// Factors are missing but a fetch is already in flight.
    FetchPending,
}

/// Cache of per-key replication factors with fetch deduplication.
#[derive(Debug, Default)]
pub struct ReplicationMap {
    factors: HashMap<String, ReplicationFactor>,
    in_flight: HashSet<String>,
}

impl ReplicationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ReplicationFactor> {
        self.factors.get(key)
    }

    /// Look up `key`, marking a fetch as in flight when one is needed.
    pub fn lookup(&mut self, key: &str) -> FactorLookup {
        if self.factors.contains_key(key) {
            return FactorLookup::Known;
        }
        if self.in_flight.insert(key.to_string()) {
            FactorLookup::FetchNeeded
        } else {
            FactorLookup::FetchPending
        }
    }

    /// Request a refetch of already-known factors, keeping the cached
    /// value usable meanwhile. Returns true when the caller must issue the
    /// fetch, false when one is already in flight.
    pub fn refresh(&mut self, key: &str) -> bool {
        self.in_flight.insert(key.to_string())
    }

    /// Install fetched or pushed factors, clearing the in-flight mark.
    /// Later updates for the same key overwrite earlier ones.
    pub fn apply(&mut self, rep: &KeyReplication) {
        self.in_flight.remove(&rep.key);
        self.factors
            .insert(rep.key.clone(), ReplicationFactor::from_wire(rep));
    }

    /// Drop the cached factors for `key`. The next lookup fetches afresh.
    /// Called when ring membership changes, since the factors stored for a
    /// key may have been rewritten during the reshuffle.
    pub fn invalidate(&mut self, key: &str) {
        self.factors.remove(key);
        self.in_flight.remove(key);
    }

    /// Drop every cached factor.
    pub fn invalidate_all(&mut self) {
        self.factors.clear();
        self.in_flight.clear();
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

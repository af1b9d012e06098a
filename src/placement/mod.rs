//! Key placement: tiers, rings, and replication factors.
//!
//! Placement answers one question: which worker threads serve a key right
//! now. The answer combines three inputs, each kept in this module:
//!
//! - a cross-node consistent hash ring per tier ([`ring::HashRing`]),
//! - a thread assignment ring per tier ([`local::LocalRing`]),
//! - the key's replication factors ([`replication::ReplicationMap`]).
//!
//! The rings are shared cluster state behind a [`SharedTopology`] lock;
//! replication factors are private to each worker and router task and are
//! fetched on demand. [`resolve`] ties the three together.

pub mod local;
pub mod node;
pub mod replication;
pub mod resolve;
pub mod ring;
pub mod tier;

pub use node::{NodeId, NodeInfo, RouterThread, Worker};
pub use replication::{FactorLookup, ReplicationFactor, ReplicationMap};
pub use resolve::{
    factors_or_fetch, refresh_factors, resolve_or_fetch, responsible_workers, serving_workers,
    FactorResolution, Resolution,
};
pub use ring::{hash_key, HashRing};
pub use tier::Tier;

use local::LocalRing;
use parking_lot::RwLock;
use std::sync::Arc;

/// Cluster placement state shared by every task on a node.
pub type SharedTopology = Arc<RwLock<Topology>>;

struct TierState {
    ring: HashRing,
    local: LocalRing,
}

/// Per-tier membership rings plus the tier-wide thread assignment rings.
pub struct Topology {
    memory: TierState,
    disk: TierState,
}

impl Topology {
    /// Empty rings with the given worker thread count per tier. Thread
    /// counts are cluster-wide configuration: every node of a tier runs
    /// the same number of workers.
    pub fn new(memory_threads: u32, disk_threads: u32) -> Self {
        Self::with_geometry(
            memory_threads,
            disk_threads,
            ring::DEFAULT_VIRTUAL_NODES,
            local::DEFAULT_VIRTUAL_THREADS,
        )
    }

    /// Like [`Topology::new`] with explicit ring geometry.
    pub fn with_geometry(
        memory_threads: u32,
        disk_threads: u32,
        virtual_nodes: usize,
        virtual_threads: usize,
    ) -> Self {
        let tier_state = |threads: u32| TierState {
            ring: HashRing::new(virtual_nodes),
            local: LocalRing::new(threads, virtual_threads),
        };
        Self {
            memory: tier_state(memory_threads),
            disk: tier_state(disk_threads),
        }
    }

    fn state(&self, tier: Tier) -> &TierState {
        match tier {
            Tier::Memory => &self.memory,
            Tier::Disk => &self.disk,
        }
    }

    fn state_mut(&mut self, tier: Tier) -> &mut TierState {
        match tier {
            Tier::Memory => &mut self.memory,
            Tier::Disk => &mut self.disk,
        }
    }

    pub fn ring(&self, tier: Tier) -> &HashRing {
        &self.state(tier).ring
    }

    pub fn local(&self, tier: Tier) -> &LocalRing {
        &self.state(tier).local
    }

    /// Add a node to its tier's ring. Returns false for a duplicate id.
    pub fn join(&mut self, tier: Tier, node: NodeInfo) -> bool {
        self.state_mut(tier).ring.insert(node)
    }

    /// Remove a node from its tier's ring.
    pub fn depart(&mut self, tier: Tier, id: &str) -> Option<NodeInfo> {
        self.state_mut(tier).ring.remove(id)
    }

    /// Total node count across all tiers. Zero means no key can be served.
    pub fn total_nodes(&self) -> usize {
        Tier::ALL.iter().map(|&t| self.ring(t).len()).sum()
    }

    pub fn shared(self) -> SharedTopology {
        Arc::new(RwLock::new(self))
    }
}

//! Cross-node consistent hash ring.
//!
//! One ring exists per tier. Nodes are expanded into a fixed number of
//! virtual points on a `u64` ring; ownership of a key hash is found by
//! walking clockwise from the hash and collecting distinct nodes. Adding
//! or removing one node therefore only remaps the keys adjacent to its
//! virtual points.

use super::node::{NodeId, NodeInfo};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hasher;
use twox_hash::XxHash64;

/// Seed for all placement hashing. Changing it remaps the entire keyspace.
const HASH_SEED: u64 = 0;

/// Virtual points per node. Higher values smooth the key distribution at
/// the cost of a larger ring map.
pub const DEFAULT_VIRTUAL_NODES: usize = 128;

/// Hash a key onto the placement ring.
///
/// The same hash is used against the cross-node ring and the local thread
/// ring, so one computation per key suffices.
pub fn hash_key(key: &str) -> u64 {
    let mut hasher = XxHash64::with_seed(HASH_SEED);
    hasher.write(key.as_bytes());
    hasher.finish()
}

fn virtual_point(id: &str, replica: u32) -> u64 {
    let mut hasher = XxHash64::with_seed(HASH_SEED);
    hasher.write(id.as_bytes());
    hasher.write_u32(replica);
    hasher.finish()
}

/// Consistent hash ring over the nodes of one tier.
#[derive(Debug, Clone)]
pub struct HashRing {
    points: BTreeMap<u64, NodeId>,
    nodes: HashMap<NodeId, NodeInfo>,
    virtual_nodes: usize,
}

impl HashRing {
    pub fn new(virtual_nodes: usize) -> Self {
        Self {
            points: BTreeMap::new(),
            nodes: HashMap::new(),
            virtual_nodes: virtual_nodes.max(1),
        }
    }

    /// Number of distinct nodes on the ring.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&NodeInfo> {
        self.nodes.get(id)
    }

    /// Add a node. Returns false if a node with the same id is already
    /// present, in which case the ring is unchanged.
    pub fn insert(&mut self, node: NodeInfo) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        for replica in 0..self.virtual_nodes {
            self.points
                .insert(virtual_point(&node.id, replica as u32), node.id.clone());
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    /// Remove a node and all of its virtual points.
    pub fn remove(&mut self, id: &str) -> Option<NodeInfo> {
        let info = self.nodes.remove(id)?;
        self.points.retain(|_, owner| owner != id);
        Some(info)
    }

    /// The first `count` distinct nodes at or after `key_hash`, walking
    /// clockwise with wraparound. Returns fewer than `count` nodes when
    /// the ring holds fewer.
    pub fn responsible_nodes(&self, key_hash: u64, count: usize) -> Vec<&NodeInfo> {
        let mut owners: Vec<&NodeInfo> = Vec::with_capacity(count.min(self.nodes.len()));
        if count == 0 || self.points.is_empty() {
            return owners;
        }
        let walk = self
            .points
            .range(key_hash..)
            .chain(self.points.range(..key_hash));
        for (_, id) in walk {
            if owners.iter().any(|info| &info.id == id) {
                continue;
            }
            if let Some(info) = self.nodes.get(id) {
                owners.push(info);
            }
            if owners.len() == count {
                break;
            }
        }
        owners
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new(DEFAULT_VIRTUAL_NODES)
    }
}

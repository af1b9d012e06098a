//! Per-node thread assignment ring.
//!
//! Within a responsible node, the worker threads that own a key are chosen
//! by a second consistent hash ring over thread indexes. Every node of a
//! tier runs the same thread count, so one shared ring per tier answers
//! the assignment for all of them, and every peer derives the same answer
//! without coordination.

use std::collections::BTreeMap;
use std::hash::Hasher;
use twox_hash::XxHash64;

const HASH_SEED: u64 = 0;

/// Virtual points per thread.
pub const DEFAULT_VIRTUAL_THREADS: usize = 32;

fn virtual_point(thread: u32, replica: u32) -> u64 {
    let mut hasher = XxHash64::with_seed(HASH_SEED);
    hasher.write_u32(thread);
    hasher.write_u32(replica);
    hasher.finish()
}

/// Consistent hash ring over the thread indexes of one tier's nodes.
#[derive(Debug, Clone)]
pub struct LocalRing {
    points: BTreeMap<u64, u32>,
    threads: u32,
}

impl LocalRing {
    /// A ring over thread indexes `0..threads`.
    pub fn new(threads: u32, virtual_threads: usize) -> Self {
        let mut points = BTreeMap::new();
        for thread in 0..threads {
            for replica in 0..virtual_threads.max(1) {
                points.insert(virtual_point(thread, replica as u32), thread);
            }
        }
        Self { points, threads }
    }

    /// Thread count the ring was built over.
    pub fn threads(&self) -> u32 {
        self.threads
    }

    /// The first `count` distinct thread indexes at or after `key_hash`,
    /// walking clockwise with wraparound.
    pub fn responsible_threads(&self, key_hash: u64, count: usize) -> Vec<u32> {
        let mut owners = Vec::with_capacity(count.min(self.threads as usize));
        if count == 0 || self.points.is_empty() {
            return owners;
        }
        let walk = self
            .points
            .range(key_hash..)
            .chain(self.points.range(..key_hash));
        for (_, thread) in walk {
            if owners.contains(thread) {
                continue;
            }
            owners.push(*thread);
            if owners.len() == count {
                break;
            }
        }
        owners
    }
}

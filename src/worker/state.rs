//! Per-worker state.

use crate::lattice::store::LatticeStore;
use crate::placement::{ReplicationFactor, ReplicationMap, Worker};
use crate::worker::access::AccessTracker;
use crate::worker::pending::PendingQueue;
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Everything a worker task owns exclusively.
///
/// One instance per worker task; handlers take it `&mut` and nothing else
/// ever touches it, so there is no locking anywhere in the request path.
/// Ownership of a key's processing moves between workers only by message
/// passing.
pub struct WorkerState {
    /// This worker's identity on the rings.
    pub identity: Worker,

    /// The lattice value partition this worker serves.
    pub store: LatticeStore,

    /// Operations parked until their key's ownership is known.
    pub pending: PendingQueue,

    /// Access history feeding the periodic stats report.
    pub access: AccessTracker,

    /// Cached replication factors with fetch deduplication.
    pub replication: ReplicationMap,

    /// Factors answered for keys that have never been configured
    /// explicitly.
    pub default_factor: ReplicationFactor,

    /// Randomness for fetch target and forward target selection.
    pub rng: SmallRng,

    propagation_seq: u64,
}

impl WorkerState {
    pub fn new(identity: Worker, default_factor: ReplicationFactor) -> Self {
        Self::with_rng(identity, default_factor, SmallRng::from_entropy())
    }

    /// Deterministic variant for tests.
    pub fn with_seed(identity: Worker, default_factor: ReplicationFactor, seed: u64) -> Self {
        Self::with_rng(identity, default_factor, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(identity: Worker, default_factor: ReplicationFactor, rng: SmallRng) -> Self {
        Self {
            identity,
            store: LatticeStore::new(),
            pending: PendingQueue::new(),
            access: AccessTracker::new(),
            replication: ReplicationMap::new(),
            default_factor,
            rng,
            propagation_seq: 0,
        }
    }

    /// Correlation id for the next outgoing propagation batch.
    pub(crate) fn next_propagation_id(&mut self) -> String {
        self.propagation_seq += 1;
        format!("{}:propagation:{}", self.identity, self.propagation_seq)
    }
}

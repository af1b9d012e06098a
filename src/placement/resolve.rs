//! Key to worker resolution.
//!
//! Resolution combines a key's replication factors with the tier rings.
//! Metadata keys bypass the replication registry entirely and resolve with
//! a fixed single-replica factor, which keeps factor fetches themselves
//! routable. Two views of the answer exist:
//!
//! - [`responsible_workers`]: every worker holding the key, all tiers.
//!   Workers use this to decide whether they own a key and to size the
//!   set behind the client's `invalidate` flag.
//! - [`serving_workers`]: the workers of the first tier, in priority
//!   order, that yields a non-empty set. Routers hand this to clients so
//!   reads land on the fastest tier holding the key.

use super::node::Worker;
use super::replication::{FactorLookup, ReplicationFactor, ReplicationMap};
use super::ring::hash_key;
use super::tier::Tier;
use super::Topology;
use crate::net::{Envelope, Transport};
use crate::protocol::{self, Address, ReplicationFactorRequest};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;

/// Outcome of resolving a key's replication factors.
#[derive(Debug, Clone, PartialEq)]
pub enum FactorResolution {
    /// Factors are available.
    Known(ReplicationFactor),
    /// Factors are unknown. A fetch has been issued now or is already in
    /// flight; the caller parks the work until an update lands.
    Pending,
}

/// Outcome of resolving a key to its owning workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The workers serving the key, tiers in priority order. Empty when
    /// the factors name no tier that currently has nodes.
    Owners(Vec<Worker>),
    /// See [`FactorResolution::Pending`].
    Pending,
}

/// The workers holding `key` under `factor`, across every tier.
pub fn responsible_workers(
    topology: &Topology,
    key: &str,
    factor: &ReplicationFactor,
) -> Vec<Worker> {
    let hash = hash_key(key);
    let mut workers = Vec::new();
    for &tier in &Tier::ALL {
        workers.extend(tier_workers(topology, tier, hash, factor));
    }
    workers
}

/// The workers clients should talk to for `key`: the first tier in
/// priority order with a non-empty responsible set.
pub fn serving_workers(topology: &Topology, key: &str, factor: &ReplicationFactor) -> Vec<Worker> {
    let hash = hash_key(key);
    for &tier in &Tier::ALL {
        let workers = tier_workers(topology, tier, hash, factor);
        if !workers.is_empty() {
            return workers;
        }
    }
    Vec::new()
}

fn tier_workers(
    topology: &Topology,
    tier: Tier,
    hash: u64,
    factor: &ReplicationFactor,
) -> Vec<Worker> {
    let replicas = factor.global(tier) as usize;
    if replicas == 0 {
        return Vec::new();
    }
    let threads = topology
        .local(tier)
        .responsible_threads(hash, factor.local(tier) as usize);
    let mut workers = Vec::new();
    for node in topology.ring(tier).responsible_nodes(hash, replicas) {
        for &thread in &threads {
            workers.push(node.worker(thread));
        }
    }
    workers
}

/// Resolve the replication factors for `key`, fetching them if unknown.
///
/// The fetch goes to one random worker serving the key's replication
/// metadata, carrying `respond_to` so the factor update comes back to the
/// issuer's replication channel. Repeated calls while the fetch is in
/// flight do not issue another one.
pub fn factors_or_fetch(
    topology: &Topology,
    replication: &mut ReplicationMap,
    transport: &dyn Transport,
    rng: &mut impl Rng,
    key: &str,
    respond_to: &Address,
) -> FactorResolution {
    if protocol::is_metadata(key) {
        return FactorResolution::Known(ReplicationFactor::metadata());
    }
    match replication.lookup(key) {
        FactorLookup::Known => match replication.get(key) {
            Some(factor) => FactorResolution::Known(factor.clone()),
            None => FactorResolution::Pending,
        },
        FactorLookup::FetchNeeded => {
            issue_fetch(topology, transport, rng, key, respond_to);
            FactorResolution::Pending
        }
        FactorLookup::FetchPending => FactorResolution::Pending,
    }
}

/// Resolve `key` to the full set of workers holding it, fetching its
/// replication factors if they are unknown.
pub fn resolve_or_fetch(
    topology: &Topology,
    replication: &mut ReplicationMap,
    transport: &dyn Transport,
    rng: &mut impl Rng,
    key: &str,
    respond_to: &Address,
) -> Resolution {
    match factors_or_fetch(topology, replication, transport, rng, key, respond_to) {
        FactorResolution::Known(factor) => {
            Resolution::Owners(responsible_workers(topology, key, &factor))
        }
        FactorResolution::Pending => Resolution::Pending,
    }
}

/// Re-fetch the factors for a key whose cached value may be stale, for
/// example when a request reached a worker the cached factors say is not
/// responsible. The cached factors stay usable while the fetch is out.
pub fn refresh_factors(
    topology: &Topology,
    replication: &mut ReplicationMap,
    transport: &dyn Transport,
    rng: &mut impl Rng,
    key: &str,
    respond_to: &Address,
) {
    if replication.refresh(key) {
        issue_fetch(topology, transport, rng, key, respond_to);
    }
}

fn issue_fetch(
    topology: &Topology,
    transport: &dyn Transport,
    rng: &mut impl Rng,
    key: &str,
    respond_to: &Address,
) {
    let meta_key = protocol::replication_metadata_key(key);
    let factor = ReplicationFactor::metadata();
    let owners = responsible_workers(topology, &meta_key, &factor);
    let Some(owner) = owners.choose(rng) else {
        warn!(key, "no metadata owner available for factor fetch");
        return;
    };
    let request = ReplicationFactorRequest {
        key: key.to_string(),
        respond_to: respond_to.clone(),
    };
    if let Err(err) = transport.send(
        &owner.replication_address(),
        Envelope::ReplicationRequest(request),
    ) {
        // The in-flight mark stays set; a membership invalidation rearms it.
        warn!(key, owner = %owner, error = %err, "factor fetch could not be sent");
    }
}

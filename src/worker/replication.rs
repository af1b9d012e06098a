//! Replication factor requests, updates, and pending replay.
//!
//! A worker's replication channel carries two message kinds. Factor
//! requests arrive at the worker owning a key's replication metadata and
//! are answered from its cache or, for never-configured keys, from the
//! configured defaults. Factor updates are the answers (or management
//! pushes): they populate the local cache and wake everything parked on
//! the key.

use crate::core::error::StrataResult;
use crate::lattice::registry::LatticeRegistry;
use crate::net::{Envelope, Transport};
use crate::placement::{responsible_workers, Topology, Worker};
use crate::protocol::{
    KeyRequest, KeyResponse, KeyTuple, ReplicationFactorRequest, ReplicationFactorUpdate,
};
use crate::worker::pending::PendingOp;
use crate::worker::processor::apply_local;
use crate::worker::state::WorkerState;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

/// Answer a replication factor fetch from this worker's knowledge.
pub fn handle_factor_request(
    state: &mut WorkerState,
    transport: &dyn Transport,
    request: ReplicationFactorRequest,
) -> StrataResult<()> {
    let factor = state
        .replication
        .get(&request.key)
        .cloned()
        .unwrap_or_else(|| state.default_factor.clone());
    let update = ReplicationFactorUpdate {
        factors: vec![factor.to_wire(request.key.as_str())],
    };
    transport.send(&request.respond_to, Envelope::ReplicationUpdate(update))
}

/// Install factor updates and replay everything parked on those keys.
///
/// Replayed operations this worker owns are applied locally and answered
/// individually under their original correlation ids; operations owned
/// elsewhere are handed to a random responsible worker as fresh
/// single-tuple requests. Updates for keys with nothing parked only
/// refresh the cache.
pub fn handle_factor_update(
    state: &mut WorkerState,
    topology: &Topology,
    registry: &LatticeRegistry,
    transport: &dyn Transport,
    update: ReplicationFactorUpdate,
) -> StrataResult<()> {
    for rep in &update.factors {
        state.replication.apply(rep);

        let queued = state.pending.drain(&rep.key);
        if queued.is_empty() {
            continue;
        }

        let owners = match state.replication.get(&rep.key) {
            Some(factor) => responsible_workers(topology, &rep.key, factor),
            None => Vec::new(),
        };
        let is_owner = owners.contains(&state.identity);
        debug!(
            key = %rep.key,
            queued = queued.len(),
            owners = owners.len(),
            is_owner,
            "factors arrived; replaying"
        );

        for op in queued {
            if is_owner {
                let tp = apply_local(
                    state,
                    registry,
                    &rep.key,
                    op.operation,
                    op.lattice_type,
                    &op.payload,
                    0,
                    owners.len(),
                );
                if let Some(address) = &op.response_address {
                    let response = KeyResponse {
                        response_id: op.request_id.clone(),
                        operation: op.operation,
                        tuples: vec![tp],
                    };
                    if let Err(err) = transport.send(address, Envelope::KeyResponse(response)) {
                        warn!(key = %rep.key, error = %err, "replay response undeliverable");
                    }
                }
            } else {
                forward_op(state, transport, &owners, &rep.key, op);
            }
        }
    }
    Ok(())
}

/// Hand a replayed operation to a worker that actually owns the key.
fn forward_op(
    state: &mut WorkerState,
    transport: &dyn Transport,
    owners: &[Worker],
    key: &str,
    op: PendingOp,
) {
    let Some(target) = owners.choose(&mut state.rng) else {
        warn!(key, request_id = %op.request_id, "no responsible worker; dropping");
        return;
    };
    let tuple = KeyTuple {
        key: key.to_string(),
        payload: op.payload,
        lattice_type: op.lattice_type,
        address_cache_size: 0,
    };
    let mut request = KeyRequest::new(op.request_id, op.operation, vec![tuple]);
    request.response_address = op.response_address;
    if let Err(err) = transport.send(&target.request_address(), Envelope::KeyRequest(request)) {
        warn!(key, target = %target, error = %err, "forward undeliverable");
    }
}

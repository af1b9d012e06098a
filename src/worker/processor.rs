//! Batch key request processing.
//!
//! One call handles one request envelope. Every tuple in the batch is
//! processed independently: a tuple that goes pending or gets dropped
//! never affects its siblings, and the response carries exactly the
//! tuples that produced a result this round. Tuples parked in the pending
//! queue are answered later, from the factor update path, under the same
//! correlation id.

use crate::core::error::{ErrorCode, StrataResult};
use crate::core::time::Timestamp;
use crate::lattice::registry::LatticeRegistry;
use crate::lattice::LatticeType;
use crate::net::{Envelope, Transport};
use crate::placement::{refresh_factors, resolve_or_fetch, Resolution, Topology};
use crate::protocol::{self, KeyRequest, KeyResponse, KeyTuple, OperationKind, ResponseTuple};
use crate::worker::pending::PendingOp;
use crate::worker::state::WorkerState;
use bytes::Bytes;
use tracing::{debug, error, info, warn};

/// Process one batch request against this worker's state.
///
/// A response is sent only when at least one tuple produced a result and
/// the request named a response address.
pub fn handle_request(
    state: &mut WorkerState,
    topology: &Topology,
    registry: &LatticeRegistry,
    transport: &dyn Transport,
    request: KeyRequest,
) -> StrataResult<()> {
    let mut tuples = Vec::new();
    for tuple in &request.tuples {
        process_tuple(state, topology, registry, transport, &request, tuple, &mut tuples);
    }

    if !tuples.is_empty() {
        if let Some(address) = &request.response_address {
            let response = KeyResponse {
                response_id: request.request_id.clone(),
                operation: request.operation,
                tuples,
            };
            transport.send(address, Envelope::KeyResponse(response))?;
        }
    }
    Ok(())
}

fn process_tuple(
    state: &mut WorkerState,
    topology: &Topology,
    registry: &LatticeRegistry,
    transport: &dyn Transport,
    request: &KeyRequest,
    tuple: &KeyTuple,
    out: &mut Vec<ResponseTuple>,
) {
    let key = tuple.key.as_str();

    // Admin side channel: the flush token clears this worker's partition
    // and short-circuits without touching placement or access tracking.
    if key == protocol::FLUSH_ALL_KEY {
        let freed = state.store.payload_bytes();
        let dropped = state.store.clear();
        info!(dropped, freed_bytes = freed, "flush token received; store cleared");
        out.push(ResponseTuple::bare(key));
        return;
    }

    let respond_to = state.identity.replication_address();
    let resolution = resolve_or_fetch(
        topology,
        &mut state.replication,
        transport,
        &mut state.rng,
        key,
        &respond_to,
    );

    match resolution {
        Resolution::Pending => {
            debug!(key, request_id = %request.request_id, "ownership unknown; queueing");
            state.pending.enqueue(key, PendingOp::capture(request, tuple));
        }
        Resolution::Owners(owners) => {
            if !owners.contains(&state.identity) {
                if protocol::is_metadata(key) {
                    let mut tp = ResponseTuple::bare(key);
                    tp.lattice_type = tuple.lattice_type;
                    tp.error = Some(ErrorCode::WrongThread);
                    out.push(tp);
                } else {
                    // Our cached factors say another worker owns this key;
                    // they may be stale, so refetch while the op waits.
                    debug!(key, request_id = %request.request_id, "not responsible; queueing");
                    refresh_factors(
                        topology,
                        &mut state.replication,
                        transport,
                        &mut state.rng,
                        key,
                        &respond_to,
                    );
                    state.pending.enqueue(key, PendingOp::capture(request, tuple));
                }
            } else {
                let tp = apply_local(
                    state,
                    registry,
                    key,
                    request.operation,
                    tuple.lattice_type,
                    &tuple.payload,
                    tuple.address_cache_size,
                    owners.len(),
                );
                out.push(tp);
            }
        }
    }
}

/// Apply one owned key operation against the store and produce its
/// response tuple.
///
/// The tuple always carries the key, even when a schema-violating put was
/// dropped; the access tracker records every owned operation regardless
/// of its outcome.
#[allow(clippy::too_many_arguments)]
pub(crate) fn apply_local(
    state: &mut WorkerState,
    registry: &LatticeRegistry,
    key: &str,
    operation: OperationKind,
    lattice_type: LatticeType,
    payload: &Bytes,
    address_cache_size: u32,
    responsible_count: usize,
) -> ResponseTuple {
    let mut tp = ResponseTuple::bare(key);

    match operation {
        OperationKind::Get => match state.store.get(key) {
            None => tp.error = Some(ErrorCode::KeyDne),
            Some(value) => {
                tp.lattice_type = value.lattice_type();
                tp.payload = value.payload().clone();
            }
        },
        OperationKind::Put => match state.store.put(key, lattice_type, payload, registry) {
            Ok(()) => tp.lattice_type = lattice_type,
            Err(err) if err.is_schema_violation() => {
                error!(key, error = %err, "put dropped");
            }
            Err(err) => {
                warn!(key, lattice = %lattice_type, error = %err, "put failed");
            }
        },
    }

    if address_cache_size > 0 && address_cache_size as usize != responsible_count {
        tp.invalidate = true;
    }

    state.access.record(key, Timestamp::now());
    tp
}

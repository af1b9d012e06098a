//! Periodic changeset propagation and stats reporting.
//!
//! Both run off timers in the worker loop, never on the request path.
//! Propagation pushes each dirty key's merged value to every other
//! responsible worker as a fire-and-forget PUT batch; merge idempotence
//! makes redelivery harmless. Reporting ships the access tracker's window
//! counts to the configured monitoring address and evicts aged records.

use crate::core::error::StrataResult;
use crate::core::time::Timestamp;
use crate::net::{Envelope, Transport};
use crate::placement::{resolve_or_fetch, Resolution, Topology, Worker};
use crate::protocol::{Address, KeyRequest, KeyTuple, OperationKind, StatsReport};
use crate::worker::state::WorkerState;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Push every key mutated since the last cycle to its other replicas.
pub fn propagate_changeset(
    state: &mut WorkerState,
    topology: &Topology,
    transport: &dyn Transport,
) -> StrataResult<()> {
    let dirty = state.store.take_changeset();
    if dirty.is_empty() {
        return Ok(());
    }

    let respond_to = state.identity.replication_address();
    let mut batches: HashMap<Worker, Vec<KeyTuple>> = HashMap::new();
    let mut deferred = 0usize;

    for key in dirty {
        let Some(value) = state.store.get(&key) else {
            // Flushed since the write; nothing to push.
            continue;
        };
        let (lattice_type, payload) = (value.lattice_type(), value.payload().clone());

        let resolution = resolve_or_fetch(
            topology,
            &mut state.replication,
            transport,
            &mut state.rng,
            &key,
            &respond_to,
        );
        match resolution {
            Resolution::Pending => {
                // Keep the key dirty; the next cycle retries with factors.
                state.store.mark_dirty(&key);
                deferred += 1;
            }
            Resolution::Owners(owners) => {
                for owner in owners {
                    if owner == state.identity {
                        continue;
                    }
                    batches
                        .entry(owner)
                        .or_default()
                        .push(KeyTuple::put(key.clone(), lattice_type, payload.clone()));
                }
            }
        }
    }

    let batch_count = batches.len();
    for (worker, tuples) in batches {
        let request = KeyRequest::new(state.next_propagation_id(), OperationKind::Put, tuples);
        if let Err(err) = transport.send(&worker.request_address(), Envelope::KeyRequest(request)) {
            warn!(target = %worker, error = %err, "propagation batch undeliverable");
        }
    }
    if batch_count > 0 || deferred > 0 {
        debug!(batches = batch_count, deferred, "changeset propagated");
    }
    Ok(())
}

/// Ship a window-bounded access report and evict aged records.
pub fn report_stats(
    state: &mut WorkerState,
    transport: &dyn Transport,
    monitoring: &Address,
    window_ms: u64,
) -> StrataResult<()> {
    let cutoff = Timestamp::now().window_start(window_ms);
    state.access.evict_before(cutoff);

    let report = StatsReport {
        node: state.identity.node.clone(),
        thread: state.identity.thread,
        access_total: state.access.total(),
        window_ms,
        key_counts: state.access.counts_since(cutoff),
    };
    transport.send(monitoring, Envelope::Stats(report))
}

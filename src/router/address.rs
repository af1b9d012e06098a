//! Address resolution handlers.
//!
//! A router thread answers "which workers serve this key" without touching
//! key data. Keys resolve independently: a key whose replication factors
//! are not cached yet is parked while a fetch runs, and the rest of the
//! batch is answered immediately. Parked requests are replayed as soon as
//! the factor update lands.

use crate::core::error::{ErrorCode, StrataResult};
use crate::net::{Envelope, Transport};
use crate::placement::{
    factors_or_fetch, serving_workers, FactorResolution, ReplicationMap, RouterThread, Topology,
};
use crate::protocol::{
    Address, AddressRequest, AddressResponse, Key, KeyAddresses, ReplicationFactorUpdate,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Exclusive state of one router task.
pub struct RouterState {
    pub thread: RouterThread,
    pub replication: ReplicationMap,
    /// Requests parked on a factor fetch: key to (reply address, request id).
    pending: HashMap<Key, Vec<(Address, String)>>,
    pub(crate) rng: SmallRng,
}

impl RouterState {
    pub fn new(thread: RouterThread) -> Self {
        Self::with_rng(thread, SmallRng::from_entropy())
    }

    /// Deterministic variant for tests.
    pub fn with_seed(thread: RouterThread, seed: u64) -> Self {
        Self::with_rng(thread, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(thread: RouterThread, rng: SmallRng) -> Self {
        Self {
            thread,
            replication: ReplicationMap::new(),
            pending: HashMap::new(),
            rng,
        }
    }

    /// Number of requests parked on factor fetches.
    pub fn pending_total(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }
}

/// Answer a batch address request.
///
/// An empty cluster is answered immediately with `NoServers` and a bare
/// entry per key. Otherwise each key resolves on its own; the response is
/// sent only when at least one key resolved, and the rest follow from
/// [`handle_factor_update`] once their fetches complete.
pub fn handle_address_request(
    state: &mut RouterState,
    topology: &Topology,
    transport: &dyn Transport,
    request: AddressRequest,
) -> StrataResult<()> {
    let mut response = AddressResponse {
        response_id: request.request_id.clone(),
        error: None,
        addresses: Vec::new(),
    };

    if topology.total_nodes() == 0 {
        response.error = Some(ErrorCode::NoServers);
        for key in &request.keys {
            response.addresses.push(KeyAddresses {
                key: key.clone(),
                serving: Vec::new(),
            });
        }
        return transport.send(&request.response_address, Envelope::AddressResponse(response));
    }

    let respond_to = state.thread.replication_address();
    for key in &request.keys {
        if key.is_empty() {
            response.addresses.push(KeyAddresses {
                key: key.clone(),
                serving: Vec::new(),
            });
            continue;
        }
        match factors_or_fetch(
            topology,
            &mut state.replication,
            transport,
            &mut state.rng,
            key,
            &respond_to,
        ) {
            FactorResolution::Known(factor) => {
                let serving = serving_workers(topology, key, &factor)
                    .iter()
                    .map(|worker| worker.request_address())
                    .collect();
                response.addresses.push(KeyAddresses {
                    key: key.clone(),
                    serving,
                });
            }
            FactorResolution::Pending => {
                debug!(key, "address request parked on factor fetch");
                state
                    .pending
                    .entry(key.clone())
                    .or_default()
                    .push((request.response_address.clone(), request.request_id.clone()));
            }
        }
    }

    if response.addresses.is_empty() {
        return Ok(());
    }
    transport.send(&request.response_address, Envelope::AddressResponse(response))
}

/// Absorb a replication factor update and replay the requests parked on it.
///
/// Each parked request gets its own response carrying the original request
/// id, so clients correlate it with the batch that parked the key.
pub fn handle_factor_update(
    state: &mut RouterState,
    topology: &Topology,
    transport: &dyn Transport,
    update: ReplicationFactorUpdate,
) -> StrataResult<()> {
    for rep in &update.factors {
        state.replication.apply(rep);
        let Some(waiting) = state.pending.remove(&rep.key) else {
            continue;
        };
        let Some(factor) = state.replication.get(&rep.key) else {
            continue;
        };
        let serving: Vec<Address> = serving_workers(topology, &rep.key, factor)
            .iter()
            .map(|worker| worker.request_address())
            .collect();
        for (address, request_id) in waiting {
            let response = AddressResponse {
                response_id: request_id,
                error: None,
                addresses: vec![KeyAddresses {
                    key: rep.key.clone(),
                    serving: serving.clone(),
                }],
            };
            if let Err(err) = transport.send(&address, Envelope::AddressResponse(response)) {
                warn!(key = %rep.key, error = %err, "parked address response dropped");
            }
        }
    }
    Ok(())
}

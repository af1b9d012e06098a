//! Worker tasks.
//!
//! A worker is one task owning one partition of the keyspace. It consumes
//! two channels, key requests and replication traffic, and runs two
//! timers, changeset propagation and stats reporting. All handler logic
//! is synchronous over the task's exclusive [`WorkerState`]; the loop here
//! only routes messages and ticks into it.
//!
//! - [`processor`] - batch GET/PUT handling
//! - [`replication`] - factor fetch answering, updates, pending replay
//! - [`pending`] - per-key queues awaiting ownership resolution
//! - [`access`] - access history behind the stats report
//! - [`flush`] - the periodic propagation and reporting passes
//! - [`state`] - the per-task state bundle

pub mod access;
pub mod flush;
pub mod pending;
pub mod processor;
pub mod replication;
pub mod state;

pub use processor::handle_request;
pub use replication::{handle_factor_request, handle_factor_update};
pub use state::WorkerState;

use crate::core::time::Timestamp;
use crate::lattice::registry::LatticeRegistry;
use crate::net::{ChannelTransport, Envelope, Transport};
use crate::placement::SharedTopology;
use crate::protocol::Address;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Timer and reporting settings for a worker loop.
#[derive(Debug, Clone)]
pub struct WorkerSchedule {
    /// How often the changeset is pushed to other replicas.
    pub propagate_interval: Duration,
    /// How often access stats are reported and aged records evicted.
    pub report_interval: Duration,
    /// Lookback window carried in each stats report.
    pub report_window_ms: u64,
    /// Destination for stats reports; `None` disables reporting but keeps
    /// the eviction pass.
    pub monitoring: Option<Address>,
}

/// Run one worker until shutdown.
pub async fn run_worker(
    mut state: WorkerState,
    topology: SharedTopology,
    registry: Arc<LatticeRegistry>,
    transport: Arc<ChannelTransport>,
    schedule: WorkerSchedule,
    mut shutdown: watch::Receiver<bool>,
) {
    let request_address = state.identity.request_address();
    let replication_address = state.identity.replication_address();
    let mut requests = transport.register(request_address.clone());
    let mut replication = transport.register(replication_address.clone());

    let mut propagate_tick = tokio::time::interval(schedule.propagate_interval);
    let mut report_tick = tokio::time::interval(schedule.report_interval);
    // Swallow the immediate first tick so timers start one period out.
    propagate_tick.tick().await;
    report_tick.tick().await;

    info!(worker = %state.identity, "worker started");
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            message = requests.recv() => match message {
                Some(envelope) => dispatch(&mut state, &topology, &registry, transport.as_ref(), envelope),
                None => break,
            },
            message = replication.recv() => match message {
                Some(envelope) => dispatch(&mut state, &topology, &registry, transport.as_ref(), envelope),
                None => break,
            },
            _ = propagate_tick.tick() => {
                let topo = topology.read();
                if let Err(err) = flush::propagate_changeset(&mut state, &topo, transport.as_ref()) {
                    warn!(worker = %state.identity, error = %err, "changeset propagation failed");
                }
            }
            _ = report_tick.tick() => match &schedule.monitoring {
                Some(address) => {
                    if let Err(err) = flush::report_stats(
                        &mut state,
                        transport.as_ref(),
                        address,
                        schedule.report_window_ms,
                    ) {
                        warn!(worker = %state.identity, error = %err, "stats report failed");
                    }
                }
                None => {
                    state
                        .access
                        .evict_before(Timestamp::now().window_start(schedule.report_window_ms));
                }
            },
        }
    }

    transport.unregister(&request_address);
    transport.unregister(&replication_address);
    info!(worker = %state.identity, "worker stopped");
}

fn dispatch(
    state: &mut WorkerState,
    topology: &SharedTopology,
    registry: &LatticeRegistry,
    transport: &dyn Transport,
    envelope: Envelope,
) {
    let topo = topology.read();
    let result = match envelope {
        Envelope::KeyRequest(request) => {
            processor::handle_request(state, &topo, registry, transport, request)
        }
        Envelope::ReplicationUpdate(update) => {
            replication::handle_factor_update(state, &topo, registry, transport, update)
        }
        Envelope::ReplicationRequest(request) => {
            replication::handle_factor_request(state, transport, request)
        }
        other => {
            warn!(kind = other.kind(), "unexpected envelope on worker channel");
            Ok(())
        }
    };
    if let Err(err) = result {
        warn!(worker = %state.identity, error = %err, "handler failed");
    }
}

//! Router tasks.
//!
//! A router thread maps keys to worker addresses for clients. It holds no
//! key data, only a private replication factor cache and the requests
//! parked on outstanding factor fetches. Like workers, router threads are
//! single-owner tasks fed by channels.

pub mod address;

pub use address::{handle_address_request, handle_factor_update, RouterState};

use crate::net::{ChannelTransport, Envelope, Transport};
use crate::placement::SharedTopology;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Run one router thread until shutdown.
pub async fn run_router(
    mut state: RouterState,
    topology: SharedTopology,
    transport: Arc<ChannelTransport>,
    mut shutdown: watch::Receiver<bool>,
) {
    let routing_address = state.thread.routing_address();
    let replication_address = state.thread.replication_address();
    let mut requests = transport.register(routing_address.clone());
    let mut replication = transport.register(replication_address.clone());

    info!(router = %state.thread, "router started");
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            message = requests.recv() => match message {
                Some(envelope) => dispatch(&mut state, &topology, transport.as_ref(), envelope),
                None => break,
            },
            message = replication.recv() => match message {
                Some(envelope) => dispatch(&mut state, &topology, transport.as_ref(), envelope),
                None => break,
            },
        }
    }

    transport.unregister(&routing_address);
    transport.unregister(&replication_address);
    info!(router = %state.thread, "router stopped");
}

fn dispatch(
    state: &mut RouterState,
    topology: &SharedTopology,
    transport: &dyn Transport,
    envelope: Envelope,
) {
    let topo = topology.read();
    let result = match envelope {
        Envelope::AddressRequest(request) => {
            address::handle_address_request(state, &topo, transport, request)
        }
        Envelope::ReplicationUpdate(update) => {
            address::handle_factor_update(state, &topo, transport, update)
        }
        other => {
            warn!(kind = other.kind(), "unexpected envelope on router channel");
            Ok(())
        }
    };
    if let Err(err) = result {
        warn!(router = %state.thread, error = %err, "handler failed");
    }
}

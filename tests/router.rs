//! Router routing-path tests.

mod common;

use common::*;
use std::collections::HashSet;
use strata::core::error::ErrorCode;
use strata::net::{ChannelTransport, Envelope};
use strata::placement::{RouterThread, Topology};
use strata::protocol::{Address, AddressRequest, KeyReplication, ReplicationFactorUpdate};
use strata::router::{self, RouterState};
use strata::worker;

fn address_request(id: &str, respond_to: &Address, keys: &[&str]) -> AddressRequest {
    AddressRequest {
        request_id: id.to_string(),
        response_address: respond_to.clone(),
        keys: keys.iter().map(|key| key.to_string()).collect(),
    }
}

// ============================================================================
// Immediate resolution
// ============================================================================

#[test]
fn known_keys_resolve_to_serving_addresses() {
    let topology = cluster_topology();
    let transport = ChannelTransport::new();
    let client = Address::from("tcp://client:9000");
    let mut client_rx = transport.register(client.clone());

    let mut router = RouterState::with_seed(RouterThread::new("10.1.0.1", 0), 11);
    router.replication.apply(&KeyReplication::uniform("k", 2, 2));

    let request = address_request("a1", &client, &["k"]);
    router::handle_address_request(&mut router, &topology, &transport, request).unwrap();

    let response = recv_address_response(&mut client_rx);
    assert_eq!(response.response_id, "a1");
    assert_eq!(response.error, None);
    assert_eq!(response.addresses.len(), 1);

    let entry = &response.addresses[0];
    assert_eq!(entry.key, "k");
    // Serving stays on the memory tier even though disk replicas exist.
    let got: HashSet<Address> = entry.serving.iter().cloned().collect();
    let expected: HashSet<Address> = [
        "tcp://10.0.0.1:6200",
        "tcp://10.0.0.1:6201",
        "tcp://10.0.0.2:6200",
        "tcp://10.0.0.2:6201",
    ]
    .into_iter()
    .map(Address::from)
    .collect();
    assert_eq!(got, expected);
}

#[test]
fn empty_cluster_reports_no_servers() {
    let topology = Topology::new(2, 1);
    let transport = ChannelTransport::new();
    let client = Address::from("tcp://client:9000");
    let mut client_rx = transport.register(client.clone());

    let mut router = RouterState::with_seed(RouterThread::new("10.1.0.1", 0), 11);
    let request = address_request("a1", &client, &["k"]);
    router::handle_address_request(&mut router, &topology, &transport, request).unwrap();

    let response = recv_address_response(&mut client_rx);
    assert_eq!(response.error, Some(ErrorCode::NoServers));
    assert_eq!(response.addresses.len(), 1);
    assert!(response.addresses[0].serving.is_empty());
}

#[test]
fn empty_key_resolves_to_nothing() {
    let topology = cluster_topology();
    let transport = ChannelTransport::new();
    let client = Address::from("tcp://client:9000");
    let mut client_rx = transport.register(client.clone());

    let mut router = RouterState::with_seed(RouterThread::new("10.1.0.1", 0), 11);
    let request = address_request("a1", &client, &[""]);
    router::handle_address_request(&mut router, &topology, &transport, request).unwrap();

    let response = recv_address_response(&mut client_rx);
    assert_eq!(response.error, None);
    assert_eq!(response.addresses.len(), 1);
    assert!(response.addresses[0].serving.is_empty());
    assert_eq!(router.pending_total(), 0);
}

// ============================================================================
// Parked requests
// ============================================================================

#[test]
fn unknown_key_parks_the_request_and_fetches_once() {
    let topology = cluster_topology();
    let transport = ChannelTransport::new();
    let client = Address::from("tcp://client:9000");
    let mut client_rx = transport.register(client.clone());
    let mut meta_rx = transport.register(metadata_owner(&topology, "cold").replication_address());

    let mut router = RouterState::with_seed(RouterThread::new("10.1.0.1", 0), 11);

    let request = address_request("a1", &client, &["cold"]);
    router::handle_address_request(&mut router, &topology, &transport, request).unwrap();

    assert!(client_rx.try_recv().is_err(), "nothing to answer yet");
    assert_eq!(router.pending_total(), 1);
    match recv_envelope(&mut meta_rx) {
        Envelope::ReplicationRequest(fetch) => {
            assert_eq!(fetch.key, "cold");
            assert_eq!(fetch.respond_to, router.thread.replication_address());
        }
        other => panic!("expected REPLICATION_REQUEST, got {}", other.kind()),
    }

    let request = address_request("a2", &client, &["cold"]);
    router::handle_address_request(&mut router, &topology, &transport, request).unwrap();
    assert_eq!(router.pending_total(), 2);
    assert!(meta_rx.try_recv().is_err(), "in-flight fetch is not reissued");
}

#[test]
fn factor_update_releases_parked_requests() {
    let topology = cluster_topology();
    let transport = ChannelTransport::new();
    let client = Address::from("tcp://client:9000");
    let mut client_rx = transport.register(client.clone());
    let mut meta_rx = transport.register(metadata_owner(&topology, "cold").replication_address());

    let mut router = RouterState::with_seed(RouterThread::new("10.1.0.1", 0), 11);
    for id in ["a1", "a2"] {
        let request = address_request(id, &client, &["cold"]);
        router::handle_address_request(&mut router, &topology, &transport, request).unwrap();
    }
    let _ = recv_envelope(&mut meta_rx);

    let update = ReplicationFactorUpdate {
        factors: vec![KeyReplication::uniform("cold", 2, 2)],
    };
    router::handle_factor_update(&mut router, &topology, &transport, update).unwrap();

    for id in ["a1", "a2"] {
        let response = recv_address_response(&mut client_rx);
        assert_eq!(response.response_id, id, "parked requests answer in arrival order");
        assert_eq!(response.error, None);
        assert_eq!(response.addresses.len(), 1);
        assert_eq!(response.addresses[0].key, "cold");
        assert_eq!(response.addresses[0].serving.len(), 4);
    }
    assert_eq!(router.pending_total(), 0);
    assert!(client_rx.try_recv().is_err());
}

#[test]
fn mixed_batch_answers_known_keys_immediately() {
    let topology = cluster_topology();
    let transport = ChannelTransport::new();
    let client = Address::from("tcp://client:9000");
    let mut client_rx = transport.register(client.clone());
    let _meta_rx = transport.register(metadata_owner(&topology, "cold").replication_address());

    let mut router = RouterState::with_seed(RouterThread::new("10.1.0.1", 0), 11);
    router.replication.apply(&KeyReplication::uniform("hot", 2, 2));

    let request = address_request("a1", &client, &["hot", "cold"]);
    router::handle_address_request(&mut router, &topology, &transport, request).unwrap();

    // The known key answers now; the unknown one waits on its fetch alone.
    let response = recv_address_response(&mut client_rx);
    assert_eq!(response.response_id, "a1");
    assert_eq!(response.addresses.len(), 1);
    assert_eq!(response.addresses[0].key, "hot");
    assert_eq!(router.pending_total(), 1);

    let update = ReplicationFactorUpdate {
        factors: vec![KeyReplication::uniform("cold", 1, 1)],
    };
    router::handle_factor_update(&mut router, &topology, &transport, update).unwrap();

    let response = recv_address_response(&mut client_rx);
    assert_eq!(response.response_id, "a1");
    assert_eq!(response.addresses.len(), 1);
    assert_eq!(response.addresses[0].key, "cold");
    assert!(!response.addresses[0].serving.is_empty());
}

#[test]
fn duplicate_update_releases_nothing_new() {
    let topology = cluster_topology();
    let transport = ChannelTransport::new();
    let client = Address::from("tcp://client:9000");
    let mut client_rx = transport.register(client.clone());
    let _meta_rx = transport.register(metadata_owner(&topology, "cold").replication_address());

    let mut router = RouterState::with_seed(RouterThread::new("10.1.0.1", 0), 11);
    let request = address_request("a1", &client, &["cold"]);
    router::handle_address_request(&mut router, &topology, &transport, request).unwrap();

    let update = || ReplicationFactorUpdate {
        factors: vec![KeyReplication::uniform("cold", 2, 2)],
    };
    router::handle_factor_update(&mut router, &topology, &transport, update()).unwrap();
    let _ = recv_address_response(&mut client_rx);

    router::handle_factor_update(&mut router, &topology, &transport, update()).unwrap();
    assert!(client_rx.try_recv().is_err());
}

// ============================================================================
// Fetch round trip through a worker
// ============================================================================

#[test]
fn worker_answers_router_fetch_with_defaults() {
    let topology = cluster_topology();
    let transport = ChannelTransport::new();
    let client = Address::from("tcp://client:9000");
    let mut client_rx = transport.register(client.clone());

    let mut router = RouterState::with_seed(RouterThread::new("10.1.0.1", 0), 11);
    let mut router_rx = transport.register(router.thread.replication_address());
    let mut meta_rx = transport.register(metadata_owner(&topology, "cold").replication_address());

    let request = address_request("a1", &client, &["cold"]);
    router::handle_address_request(&mut router, &topology, &transport, request).unwrap();

    // The metadata owner answers the fetch from its configured defaults.
    let fetch = match recv_envelope(&mut meta_rx) {
        Envelope::ReplicationRequest(fetch) => fetch,
        other => panic!("expected REPLICATION_REQUEST, got {}", other.kind()),
    };
    let mut owner = seeded_worker("m1", "10.0.0.1", 0, 7);
    worker::handle_factor_request(&mut owner, &transport, fetch).unwrap();

    let update = match recv_envelope(&mut router_rx) {
        Envelope::ReplicationUpdate(update) => update,
        other => panic!("expected REPLICATION_UPDATE, got {}", other.kind()),
    };
    router::handle_factor_update(&mut router, &topology, &transport, update).unwrap();

    let response = recv_address_response(&mut client_rx);
    assert_eq!(response.response_id, "a1");
    assert_eq!(response.addresses[0].key, "cold");
    // One memory replica with one owning thread under the stock defaults.
    assert_eq!(response.addresses[0].serving.len(), 1);
    assert!(response.addresses[0].serving[0]
        .as_str()
        .starts_with("tcp://10.0.0."));
}

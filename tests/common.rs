//! Common test utilities.
//!
//! This module contains shared fixtures for the integration suite.
//! Import with `mod common;` in test files.

use bytes::Bytes;
use strata::lattice::values::{self, LwwValue, SetValue};
use strata::lattice::LatticeType;
use strata::net::Envelope;
use strata::placement::{
    responsible_workers, NodeInfo, ReplicationFactor, Tier, Topology, Worker,
};
use strata::protocol::{self, AddressResponse, KeyResponse};
use strata::worker::WorkerState;
use tokio::sync::mpsc;

/// Two memory nodes with two worker threads each, plus one disk node with
/// a single worker thread.
pub fn cluster_topology() -> Topology {
    let mut topology = Topology::new(2, 1);
    topology.join(Tier::Memory, NodeInfo::new("m1", "10.0.0.1"));
    topology.join(Tier::Memory, NodeInfo::new("m2", "10.0.0.2"));
    topology.join(Tier::Disk, NodeInfo::new("d1", "10.0.1.1"));
    topology
}

/// A deterministic worker state for thread `thread` of the given node.
pub fn seeded_worker(id: &str, host: &str, thread: u32, seed: u64) -> WorkerState {
    let identity = NodeInfo::new(id, host).worker(thread);
    WorkerState::with_seed(identity, default_factor(), seed)
}

/// The stock replication shape: one memory replica, nothing on disk, one
/// owning thread per node.
pub fn default_factor() -> ReplicationFactor {
    ReplicationFactor::with_global(&[(Tier::Memory, 1), (Tier::Disk, 0)])
}

/// The worker a factor fetch for `key` gets sent to. The metadata factor
/// names exactly one owner, so fetch targets are deterministic.
pub fn metadata_owner(topology: &Topology, key: &str) -> Worker {
    let meta_key = protocol::replication_metadata_key(key);
    let owners = responsible_workers(topology, &meta_key, &ReplicationFactor::metadata());
    assert_eq!(owners.len(), 1, "metadata factor names a single owner");
    owners[0].clone()
}

/// Pop one envelope off a task inbox, panicking when it is empty.
pub fn recv_envelope(rx: &mut mpsc::UnboundedReceiver<Envelope>) -> Envelope {
    rx.try_recv().expect("expected an envelope")
}

/// Pop a key response off a task inbox.
pub fn recv_key_response(rx: &mut mpsc::UnboundedReceiver<Envelope>) -> KeyResponse {
    match recv_envelope(rx) {
        Envelope::KeyResponse(response) => response,
        other => panic!("expected KEY_RESPONSE, got {}", other.kind()),
    }
}

/// Pop an address response off a task inbox.
pub fn recv_address_response(rx: &mut mpsc::UnboundedReceiver<Envelope>) -> AddressResponse {
    match recv_envelope(rx) {
        Envelope::AddressResponse(response) => response,
        other => panic!("expected ADDRESS_RESPONSE, got {}", other.kind()),
    }
}

/// Encode an LWW payload with the given timestamp and value bytes.
pub fn lww_bytes(timestamp: u64, value: &[u8]) -> Bytes {
    values::encode(&LwwValue::new(timestamp, value.to_vec()), LatticeType::Lww)
        .expect("lww payload encodes")
}

/// Decode the value bytes out of an LWW payload.
pub fn lww_value(payload: &[u8]) -> Vec<u8> {
    let value: LwwValue = values::decode(payload, LatticeType::Lww).expect("lww payload decodes");
    value.value().to_vec()
}

/// Encode a single-element SET payload.
pub fn set_bytes(element: &[u8]) -> Bytes {
    values::encode(&SetValue::singleton(element.to_vec()), LatticeType::Set)
        .expect("set payload encodes")
}

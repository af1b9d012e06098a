//! Configuration and runtime tests.

mod common;

use common::*;
use std::io::Write;
use std::time::Duration;
use strata::core::config::Config;
use strata::core::error::ErrorCode;
use strata::core::runtime::Runtime;
use strata::lattice::LatticeType;
use strata::net::{ChannelTransport, Envelope, Transport};
use strata::placement::{RouterThread, Tier};
use strata::protocol::{Address, AddressRequest, KeyRequest, KeyResponse, KeyTuple, OperationKind};
use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};

// ============================================================================
// Config tests
// ============================================================================

#[test]
fn parse_minimal_config() {
    let config_content = r#"
[node]
id = "a"
"#;

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(config_content.as_bytes()).unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.node.id, "a");
    assert_eq!(config.node.host, "127.0.0.1");
    assert_eq!(config.threads.memory, 4);
    assert_eq!(config.threads.routing, 1);
    assert_eq!(config.replication.memory, 1);
    assert_eq!(config.replication.disk, 0);
    assert_eq!(config.access.window_ms, 30_000);
    assert_eq!(config.telemetry.log_level, "info");
}

#[test]
fn reject_zero_replication() {
    let config_content = r#"
[node]
id = "a"

[replication]
memory = 0
disk = 0
"#;

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(config_content.as_bytes()).unwrap();

    let result = Config::from_file(file.path());
    assert!(result.is_err());
    assert!(format!("{:#}", result.unwrap_err()).contains("replication"));
}

#[test]
fn reject_unknown_tier() {
    let config_content = r#"
[node]
id = "a"
tier = "tape"
"#;

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(config_content.as_bytes()).unwrap();

    assert!(Config::from_file(file.path()).is_err());
}

#[test]
fn seeds_must_not_list_the_local_node() {
    let config_content = r#"
[node]
id = "a"

[[cluster.seeds]]
id = "a"
host = "10.0.0.2"
"#;

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(config_content.as_bytes()).unwrap();
    assert!(Config::from_file(file.path()).is_err());

    let config = Config::from_toml(
        r#"
[node]
id = "a"

[[cluster.seeds]]
id = "b"
host = "10.0.0.2"
tier = "disk"
"#,
    )
    .unwrap();
    assert_eq!(config.cluster.seeds.len(), 1);
    assert_eq!(config.cluster.seeds[0].tier().unwrap(), Tier::Disk);
}

#[test]
fn default_factor_follows_the_replication_section() {
    let config = Config::from_toml(
        r#"
[node]
id = "a"

[replication]
memory = 2
disk = 1
local = 3
"#,
    )
    .unwrap();

    let factor = config.default_replication_factor();
    assert_eq!(factor.global(Tier::Memory), 2);
    assert_eq!(factor.global(Tier::Disk), 1);
    assert_eq!(factor.local(Tier::Memory), 3);
    assert_eq!(factor.local(Tier::Disk), 3);
}

// ============================================================================
// Runtime tests
// ============================================================================

#[test]
fn runtime_rejects_invalid_config() {
    let mut config = Config::from_toml("[node]\nid = \"a\"\n").unwrap();
    config.replication.memory = 0;
    config.replication.disk = 0;
    assert!(Runtime::new(config).is_err());
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<Envelope>) -> Envelope {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for an envelope")
        .expect("channel closed")
}

async fn recv_response(rx: &mut mpsc::UnboundedReceiver<Envelope>) -> KeyResponse {
    match recv(rx).await {
        Envelope::KeyResponse(response) => response,
        other => panic!("expected KEY_RESPONSE, got {}", other.kind()),
    }
}

fn send(transport: &ChannelTransport, to: &Address, envelope: Envelope) {
    transport.send(to, envelope).expect("envelope delivered");
}

/// Drives a full client round trip through live worker and router tasks:
/// address lookup with a factor fetch behind it, a put, a replicated get
/// from the second owner, and a flush.
#[tokio::test]
async fn runtime_serves_requests_end_to_end() {
    let config = Config::from_toml(
        r#"
[node]
id = "a"

[threads]
memory = 2
disk = 1
routing = 1

[replication]
memory = 1
disk = 0
local = 2
propagate_interval_ms = 25
"#,
    )
    .unwrap();

    let mut runtime = Runtime::new(config).unwrap();
    runtime.start().await.unwrap();

    let transport = runtime.transport();
    let client = Address::from("tcp://client:9000");
    let mut client_rx = transport.register(client.clone());

    // Two channels per worker and two per router, plus the client inbox.
    let deadline = Instant::now() + Duration::from_secs(2);
    while transport.len() < 7 {
        assert!(Instant::now() < deadline, "tasks never came up");
        sleep(Duration::from_millis(10)).await;
    }

    // Address resolution parks on a factor fetch the workers answer.
    let routing = RouterThread::new("127.0.0.1", 0).routing_address();
    let lookup = AddressRequest {
        request_id: "a1".to_string(),
        response_address: client.clone(),
        keys: vec!["session".to_string()],
    };
    send(&transport, &routing, Envelope::AddressRequest(lookup));

    let serving = match recv(&mut client_rx).await {
        Envelope::AddressResponse(response) => {
            assert_eq!(response.response_id, "a1");
            assert_eq!(response.error, None);
            assert_eq!(response.addresses[0].key, "session");
            response.addresses[0].serving.clone()
        }
        other => panic!("expected ADDRESS_RESPONSE, got {}", other.kind()),
    };
    assert_eq!(serving.len(), 2, "both local threads own under local = 2");

    // Put through the first owner.
    let put = KeyRequest::new(
        "r1",
        OperationKind::Put,
        vec![KeyTuple::put("session", LatticeType::Lww, lww_bytes(7, b"v"))],
    )
    .with_response_address(client.clone());
    send(&transport, &serving[0], Envelope::KeyRequest(put));

    let response = recv_response(&mut client_rx).await;
    assert_eq!(response.response_id, "r1");
    assert_eq!(response.tuples[0].error, None);
    assert_eq!(response.tuples[0].lattice_type, LatticeType::Lww);

    // The second owner converges once the changeset propagates.
    let deadline = Instant::now() + Duration::from_secs(2);
    let payload = loop {
        let get = KeyRequest::new(
            "r2",
            OperationKind::Get,
            vec![KeyTuple::get("session")],
        )
        .with_response_address(client.clone());
        send(&transport, &serving[1], Envelope::KeyRequest(get));

        let response = recv_response(&mut client_rx).await;
        let tuple = &response.tuples[0];
        if tuple.error.is_none() {
            break tuple.payload.clone();
        }
        assert_eq!(tuple.error, Some(ErrorCode::KeyDne));
        assert!(Instant::now() < deadline, "replica never converged");
        sleep(Duration::from_millis(20)).await;
    };
    assert_eq!(lww_value(&payload), b"v");

    // Flushing the replica empties its partition again.
    let flush = KeyRequest::new(
        "f1",
        OperationKind::Put,
        vec![KeyTuple::get(strata::protocol::FLUSH_ALL_KEY)],
    )
    .with_response_address(client.clone());
    send(&transport, &serving[1], Envelope::KeyRequest(flush));
    let response = recv_response(&mut client_rx).await;
    assert_eq!(response.response_id, "f1");

    let get = KeyRequest::new("r3", OperationKind::Get, vec![KeyTuple::get("session")])
        .with_response_address(client.clone());
    send(&transport, &serving[1], Envelope::KeyRequest(get));
    let response = recv_response(&mut client_rx).await;
    assert_eq!(response.tuples[0].error, Some(ErrorCode::KeyDne));

    runtime.stop().await.unwrap();
    assert!(!runtime.is_running());
}

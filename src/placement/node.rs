//! Node and thread identities.
//!
//! A node is a host running a fixed number of worker threads for its tier.
//! Each worker listens on ports offset by its thread index, so a `Worker`
//! value is enough to derive every address a peer needs.

use crate::protocol::Address;
use serde::{Deserialize, Serialize};

/// Stable node identifier, unique across the cluster.
pub type NodeId = String;

/// Port base for worker key-request channels.
pub const REQUEST_PORT_BASE: u16 = 6200;

/// Port base for worker replication channels (factor requests and updates).
pub const REPLICATION_PORT_BASE: u16 = 6400;

/// Port base for router address-request channels.
pub const ROUTING_PORT_BASE: u16 = 6450;

/// Port base for router replication channels.
pub const ROUTER_REPLICATION_PORT_BASE: u16 = 6500;

/// A member of a tier's hash ring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: NodeId,
    pub host: String,
}

impl NodeInfo {
    pub fn new(id: impl Into<NodeId>, host: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
        }
    }

    /// The worker with `thread` index on this node.
    pub fn worker(&self, thread: u32) -> Worker {
        Worker {
            node: self.id.clone(),
            host: self.host.clone(),
            thread,
        }
    }
}

/// One worker thread on a storage node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Worker {
    pub node: NodeId,
    pub host: String,
    pub thread: u32,
}

impl Worker {
    pub fn new(node: impl Into<NodeId>, host: impl Into<String>, thread: u32) -> Self {
        Self {
            node: node.into(),
            host: host.into(),
            thread,
        }
    }

    /// Where key requests for this worker are delivered.
    pub fn request_address(&self) -> Address {
        thread_address(&self.host, REQUEST_PORT_BASE, self.thread)
    }

    /// Where replication factor requests and updates for this worker are
    /// delivered.
    pub fn replication_address(&self) -> Address {
        thread_address(&self.host, REPLICATION_PORT_BASE, self.thread)
    }
}

impl std::fmt::Display for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.node, self.thread)
    }
}

/// One routing thread on a router node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouterThread {
    pub host: String,
    pub thread: u32,
}

impl RouterThread {
    pub fn new(host: impl Into<String>, thread: u32) -> Self {
        Self {
            host: host.into(),
            thread,
        }
    }

    /// Where address requests for this router thread are delivered.
    pub fn routing_address(&self) -> Address {
        thread_address(&self.host, ROUTING_PORT_BASE, self.thread)
    }

    /// Where replication factor updates for this router thread are
    /// delivered.
    pub fn replication_address(&self) -> Address {
        thread_address(&self.host, ROUTER_REPLICATION_PORT_BASE, self.thread)
    }
}

impl std::fmt::Display for RouterThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.thread)
    }
}

fn thread_address(host: &str, base: u16, thread: u32) -> Address {
    Address::new(format!("tcp://{host}:{}", u32::from(base) + thread))
}

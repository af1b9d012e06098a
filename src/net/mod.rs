//! Message transport seam.
//!
//! Worker and router tasks never talk to sockets directly. They hand typed
//! [`Envelope`]s to a [`Transport`], which owns delivery. The in-process
//! [`channel::ChannelTransport`] wires addresses to tokio channels and is
//! what the runtime and the test suite use; a socket-backed transport can
//! implement the same trait without touching any handler code.

pub mod channel;

pub use channel::ChannelTransport;

use crate::core::error::StrataResult;
use crate::protocol::{
    Address, AddressRequest, AddressResponse, KeyRequest, KeyResponse, ReplicationFactorRequest,
    ReplicationFactorUpdate, StatsReport,
};
use serde::{Deserialize, Serialize};

/// Every message kind exchanged between tasks and with the outside world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Envelope {
    KeyRequest(KeyRequest),
    KeyResponse(KeyResponse),
    AddressRequest(AddressRequest),
    AddressResponse(AddressResponse),
    ReplicationRequest(ReplicationFactorRequest),
    ReplicationUpdate(ReplicationFactorUpdate),
    Stats(StatsReport),
}

impl Envelope {
    /// Short kind name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::KeyRequest(_) => "key_request",
            Envelope::KeyResponse(_) => "key_response",
            Envelope::AddressRequest(_) => "address_request",
            Envelope::AddressResponse(_) => "address_response",
            Envelope::ReplicationRequest(_) => "replication_request",
            Envelope::ReplicationUpdate(_) => "replication_update",
            Envelope::Stats(_) => "stats",
        }
    }
}

/// Delivery of envelopes to addresses.
pub trait Transport: Send + Sync {
    /// Deliver `envelope` to `to`. Delivery is at-most-once; an error means
    /// the destination is unknown or its channel is gone.
    fn send(&self, to: &Address, envelope: Envelope) -> StrataResult<()>;
}

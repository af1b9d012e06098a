//! In-process channel transport.

use super::{Envelope, Transport};
use crate::core::error::{StrataError, StrataResult};
use crate::protocol::Address;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Routes envelopes between tasks over unbounded tokio channels.
///
/// Each worker and router task registers the addresses it serves at
/// startup and consumes the returned receivers in its select loop. The
/// routing table is shared behind one transport handle cloned into every
/// task.
#[derive(Debug, Default)]
pub struct ChannelTransport {
    routes: RwLock<HashMap<Address, mpsc::UnboundedSender<Envelope>>>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `address` to a fresh channel and return the receiving end.
    /// Rebinding an address replaces the previous channel.
    pub fn register(&self, address: Address) -> mpsc::UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.write().insert(address, tx);
        rx
    }

    /// Drop the binding for `address`. Subsequent sends to it fail.
    pub fn unregister(&self, address: &Address) {
        self.routes.write().remove(address);
    }

    /// Number of bound addresses.
    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }
}

impl Transport for ChannelTransport {
    fn send(&self, to: &Address, envelope: Envelope) -> StrataResult<()> {
        let routes = self.routes.read();
        let tx = routes
            .get(to)
            .ok_or_else(|| StrataError::Unroutable(to.to_string()))?;
        tx.send(envelope)
            .map_err(|_| StrataError::ChannelClosed(to.to_string()))
    }
}

//! Per-key queues of operations awaiting ownership resolution.

use crate::core::time::Timestamp;
use crate::lattice::LatticeType;
use crate::protocol::{Address, Key, KeyRequest, KeyTuple, OperationKind};
use bytes::Bytes;
use std::collections::HashMap;

/// One deferred key operation, captured with everything needed to replay
/// it once the key's ownership becomes known.
#[derive(Debug, Clone)]
pub struct PendingOp {
    pub operation: OperationKind,
    pub lattice_type: LatticeType,
    pub payload: Bytes,
    pub response_address: Option<Address>,
    pub request_id: String,
    pub enqueued_at: Timestamp,
}

impl PendingOp {
    /// Capture `tuple` from `request` for later replay.
    pub fn capture(request: &KeyRequest, tuple: &KeyTuple) -> Self {
        Self {
            operation: request.operation,
            lattice_type: tuple.lattice_type,
            payload: tuple.payload.clone(),
            response_address: request.response_address.clone(),
            request_id: request.request_id.clone(),
            enqueued_at: Timestamp::now(),
        }
    }
}

/// Arrival-ordered pending operations, keyed by the unresolved key.
#[derive(Debug, Default)]
pub struct PendingQueue {
    queues: HashMap<Key, Vec<PendingOp>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `op` to `key`'s queue.
    pub fn enqueue(&mut self, key: &str, op: PendingOp) {
        self.queues.entry(key.to_string()).or_default().push(op);
    }

    /// Remove and return `key`'s queue in arrival order. A key with no
    /// queue yields an empty vec, so duplicate resolution notifications
    /// replay nothing.
    pub fn drain(&mut self, key: &str) -> Vec<PendingOp> {
        self.queues.remove(key).unwrap_or_default()
    }

    /// Number of operations queued for `key`.
    pub fn queued(&self, key: &str) -> usize {
        self.queues.get(key).map(Vec::len).unwrap_or(0)
    }

    /// Total operations queued across all keys.
    pub fn total(&self) -> usize {
        self.queues.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

//! Request, response, and replication messages.
//!
//! These are the typed envelopes this core consumes and produces. Byte-level
//! framing of these envelopes is owned by an external wire codec; everything
//! here is plain data. Payload bytes inside tuples are opaque to the
//! protocol layer; only the per-type codec registry interprets them.

use crate::core::error::ErrorCode;
use crate::lattice::LatticeType;
use crate::placement::tier::Tier;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// An opaque key. Keys in the reserved namespaces below are classified as
/// metadata or admin keys; everything else is a data key.
pub type Key = String;

/// An opaque connection handle understood by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Reserved key namespaces
// ---------------------------------------------------------------------------

/// Namespace separator inside reserved keys.
pub const NAMESPACE_SEPARATOR: char = '|';

/// First segment of every metadata key.
pub const METADATA_IDENTIFIER: &str = "_strata_meta";

/// First segment of every admin key. Data keys may never start with a
/// reserved identifier, so admin tokens cannot collide with user data.
pub const ADMIN_IDENTIFIER: &str = "_strata_admin";

/// Reserved admin token: a request tuple bearing this key clears the
/// entire lattice store of the receiving worker.
pub const FLUSH_ALL_KEY: &str = "_strata_admin|flush_all";

fn first_segment(key: &str) -> &str {
    key.split(NAMESPACE_SEPARATOR).next().unwrap_or(key)
}

/// Classify a key as cluster metadata.
///
/// Metadata keys resolve on the metadata tier with fixed replication and
/// never go through the replication registry.
pub fn is_metadata(key: &str) -> bool {
    first_segment(key) == METADATA_IDENTIFIER
}

/// Classify a key as an admin token.
pub fn is_admin(key: &str) -> bool {
    first_segment(key) == ADMIN_IDENTIFIER
}

/// The metadata key under which a data key's replication factors live.
/// Factor fetches are routed to the owner of this key.
pub fn replication_metadata_key(key: &str) -> Key {
    format!("{METADATA_IDENTIFIER}{NAMESPACE_SEPARATOR}replication{NAMESPACE_SEPARATOR}{key}")
}

// ---------------------------------------------------------------------------
// Key requests and responses
// ---------------------------------------------------------------------------

/// GET or PUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Get,
    Put,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// One key operation inside a batch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyTuple {
    /// The key being read or written.
    pub key: Key,

    /// Encoded lattice payload (empty for GET).
    pub payload: Bytes,

    /// Lattice type tag; `None` on a PUT is a schema violation.
    pub lattice_type: LatticeType,

    /// How many serving addresses the client believes exist for this key.
    /// Zero means the client made no claim. A mismatch against the actual
    /// responsible set flags the response for cache invalidation.
    pub address_cache_size: u32,
}

impl KeyTuple {
    /// A GET tuple for `key`.
    pub fn get(key: impl Into<Key>) -> Self {
        Self {
            key: key.into(),
            payload: Bytes::new(),
            lattice_type: LatticeType::None,
            address_cache_size: 0,
        }
    }

    /// A PUT tuple for `key` carrying an encoded lattice payload.
    pub fn put(key: impl Into<Key>, lattice_type: LatticeType, payload: Bytes) -> Self {
        Self {
            key: key.into(),
            payload,
            lattice_type,
            address_cache_size: 0,
        }
    }

    /// Attach the client's cached address count.
    pub fn with_cache_size(mut self, size: u32) -> Self {
        self.address_cache_size = size;
        self
    }
}

/// A batch of key operations of one kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRequest {
    /// Correlation id echoed in the response.
    pub request_id: String,

    /// Where to deliver the response; absent for fire-and-forget traffic
    /// such as replica propagation.
    pub response_address: Option<Address>,

    /// GET or PUT, applying to every tuple.
    pub operation: OperationKind,

    /// The key operations, processed independently.
    pub tuples: Vec<KeyTuple>,
}

impl KeyRequest {
    pub fn new(
        request_id: impl Into<String>,
        operation: OperationKind,
        tuples: Vec<KeyTuple>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            response_address: None,
            operation,
            tuples,
        }
    }

    pub fn with_response_address(mut self, addr: Address) -> Self {
        self.response_address = Some(addr);
        self
    }
}

/// Per-key outcome inside a response.
///
/// A tuple with neither payload nor error code records a put that was
/// dropped for a schema violation; the details are in the worker log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseTuple {
    pub key: Key,

    /// The stored type tag (GET/PUT success) or an echo of the request tag.
    pub lattice_type: LatticeType,

    /// Merged value for a successful GET; empty otherwise.
    pub payload: Bytes,

    /// Client-actionable error, if any.
    pub error: Option<ErrorCode>,

    /// Set when the client's cached address count no longer matches the
    /// responsible set, telling it to refresh its routing table.
    pub invalidate: bool,
}

impl ResponseTuple {
    /// A bare tuple carrying only the key.
    pub fn bare(key: impl Into<Key>) -> Self {
        Self {
            key: key.into(),
            lattice_type: LatticeType::None,
            payload: Bytes::new(),
            error: None,
            invalidate: false,
        }
    }
}

/// Response to a [`KeyRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyResponse {
    /// Echo of the request's correlation id.
    pub response_id: String,

    /// Echo of the request's operation kind.
    pub operation: OperationKind,

    /// One entry per tuple that produced a result this round. Tuples that
    /// went pending are answered later, under the same correlation id.
    pub tuples: Vec<ResponseTuple>,
}

// ---------------------------------------------------------------------------
// Address resolution
// ---------------------------------------------------------------------------

/// Client request for the serving addresses of a batch of keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressRequest {
    pub request_id: String,
    pub response_address: Address,
    pub keys: Vec<Key>,
}

/// Serving addresses for a single key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyAddresses {
    pub key: Key,
    pub serving: Vec<Address>,
}

/// Response to an [`AddressRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressResponse {
    pub response_id: String,

    /// Envelope-level error; `NoServers` applies to every requested key.
    pub error: Option<ErrorCode>,

    pub addresses: Vec<KeyAddresses>,
}

// ---------------------------------------------------------------------------
// Replication factor fetch protocol
// ---------------------------------------------------------------------------

/// Asynchronous fetch of a key's replication factors, addressed to the
/// owner of the key's replication metadata. The responder is external to
/// this core; the update below is what eventually comes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationFactorRequest {
    pub key: Key,

    /// The issuer's replication-response address.
    pub respond_to: Address,
}

/// Replication level for a single key at a single tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierFactor {
    pub tier: Tier,
    pub value: u32,
}

/// Replication factors for one key: cross-node counts per tier and
/// per-node thread counts per tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyReplication {
    pub key: Key,
    pub global: Vec<TierFactor>,
    pub local: Vec<TierFactor>,
}

impl KeyReplication {
    /// Factors with the same global count on every tier and one local
    /// thread per node.
    pub fn uniform(key: impl Into<Key>, global: u32, local: u32) -> Self {
        Self {
            key: key.into(),
            global: Tier::ALL
                .iter()
                .map(|&tier| TierFactor {
                    tier,
                    value: global,
                })
                .collect(),
            local: Tier::ALL
                .iter()
                .map(|&tier| TierFactor { tier, value: local })
                .collect(),
        }
    }
}

/// A batch of factor updates delivered to a worker or router task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationFactorUpdate {
    pub factors: Vec<KeyReplication>,
}

// ---------------------------------------------------------------------------
// Access statistics
// ---------------------------------------------------------------------------

/// Periodic per-worker access report consumed by external load management.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    /// Reporting node.
    pub node: String,

    /// Reporting worker thread index.
    pub thread: u32,

    /// Process-lifetime count of locally processed key operations.
    pub access_total: u64,

    /// Width of the lookback window the per-key counts cover.
    pub window_ms: u64,

    /// Keys accessed within the window and how often.
    pub key_counts: Vec<(Key, u64)>,
}

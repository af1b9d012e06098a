//! Error types and wire error codes.
//!
//! Strata distinguishes client-actionable error codes, which travel inside
//! response tuples, from internal errors that stay on this side of the wire.
//! A request whose ownership is not yet known is neither: it is queued and
//! replayed once the replication factors arrive, and the client only ever
//! sees the eventual response.

use crate::lattice::LatticeType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Client-visible error codes carried in response tuples.
///
/// These are the only failure states a client is expected to act on:
/// retry elsewhere (`WrongThread`), treat as absent (`KeyDne`), or back off
/// until the cluster has members (`NoServers`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The key does not exist, or has never completed a typed write.
    KeyDne,
    /// This worker does not serve the requested metadata key; the caller
    /// should re-resolve and retry against the owner.
    WrongThread,
    /// No node is registered on any tier.
    NoServers,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyDne => write!(f, "KEY_DNE"),
            Self::WrongThread => write!(f, "WRONG_THREAD"),
            Self::NoServers => write!(f, "NO_SERVERS"),
        }
    }
}

/// Internal Strata error conditions.
#[derive(Debug, Error)]
pub enum StrataError {
    /// A put arrived without a lattice type tag.
    #[error("put for key {key} carries no lattice type")]
    MissingLatticeType { key: String },

    /// A put's type tag conflicts with the tag already on record.
    #[error("lattice type mismatch for key {key}: stored {stored}, request {requested}")]
    LatticeTypeMismatch {
        key: String,
        stored: LatticeType,
        requested: LatticeType,
    },

    /// No codec is registered for the given lattice type.
    #[error("no codec registered for lattice type {0}")]
    UnknownLatticeType(LatticeType),

    /// A lattice payload failed to decode.
    #[error("failed to decode {lattice} payload")]
    PayloadDecode {
        lattice: LatticeType,
        #[source]
        source: bincode::Error,
    },

    /// A lattice value failed to encode.
    #[error("failed to encode {lattice} payload")]
    PayloadEncode {
        lattice: LatticeType,
        #[source]
        source: bincode::Error,
    },

    /// The transport has no route for the destination address.
    #[error("no route registered for address {0}")]
    Unroutable(String),

    /// The destination inbox has shut down.
    #[error("channel to {0} is closed")]
    ChannelClosed(String),
}

impl StrataError {
    /// Create a `MissingLatticeType` error.
    pub fn missing_type(key: impl Into<String>) -> Self {
        Self::MissingLatticeType { key: key.into() }
    }

    /// Create a `LatticeTypeMismatch` error.
    pub fn type_mismatch(
        key: impl Into<String>,
        stored: LatticeType,
        requested: LatticeType,
    ) -> Self {
        Self::LatticeTypeMismatch {
            key: key.into(),
            stored,
            requested,
        }
    }

    /// Check if this error is a schema violation (bad put) rather than an
    /// infrastructure failure. Schema violations are logged and the
    /// offending tuple dropped; they never abort the rest of a batch.
    pub fn is_schema_violation(&self) -> bool {
        matches!(
            self,
            Self::MissingLatticeType { .. } | Self::LatticeTypeMismatch { .. }
        )
    }
}

/// Result type using StrataError.
pub type StrataResult<T> = Result<T, StrataError>;

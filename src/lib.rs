//! Strata - tiered replicated key-value store.
//!
//! Strata is the routing and execution core of a tiered key-value store.
//! Worker tasks own disjoint slices of lattice-typed state and exchange it
//! only by message passing; router tasks map keys to the workers serving
//! them; placement combines per-tier consistent hash rings with per-key
//! replication factors fetched on demand. Every value is a lattice, so
//! replicas converge under merge no matter how updates are ordered or
//! duplicated.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            Clients                              │
//! │        address lookups (routers), key batches (workers)         │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌───────────────────────────────┬─────────────────────────────────┐
//! │         Router Tasks          │          Worker Tasks           │
//! │  key → serving addresses      │  GET/PUT │ pending replay       │
//! │  parked lookups │ factors     │  access stats │ propagation     │
//! └───────────────────────────────┴─────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Placement                             │
//! │      tier rings │ thread rings │ replication factor cache       │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Lattice Store                           │
//! │      LWW │ set │ ordered set │ counter │ write-once tags        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! ## Core
//! - [`core::config`] - Configuration parsing and validation
//! - [`core::runtime`] - Task spawning and lifecycle
//! - [`core::time`] - Millisecond timestamps and windows
//! - [`core::error`] - Error types and result aliases
//!
//! ## Protocol
//! - [`protocol`] - Request, response, and replication message types
//!
//! ## Lattice
//! - [`lattice::values`] - The lattice value catalog
//! - [`lattice::registry`] - Merge codecs by lattice type
//! - [`lattice::store`] - Typed store with write-once tags and changeset
//!
//! ## Placement
//! - [`placement::ring`] - Cross-node consistent hash rings
//! - [`placement::local`] - Thread assignment rings
//! - [`placement::replication`] - Replication factors and fetch state
//! - [`placement::resolve`] - Key to worker resolution
//!
//! ## Networking
//! - [`net`] - Envelopes and the in-process channel transport
//!
//! ## Tasks
//! - [`worker`] - Request processing, replication, stats reporting
//! - [`router`] - Address resolution
//!
//! ## CLI
//! - [`cli::commands`] - CLI command implementations
//!
//! # Key Invariants
//!
//! - **TAG-ONCE**: a key's lattice type is fixed by its first accepted write
//! - **MERGE-ALWAYS**: writes merge into stored state, nothing overwrites
//! - **OWNER-ONLY**: a worker applies operations only for keys placement assigns it
//! - **REPLAY-ORDER**: operations parked on a factor fetch replay in arrival order
//! - **FETCH-ONCE**: at most one factor fetch in flight per key per task

// Core infrastructure
pub mod core;

// Wire protocol types
pub mod protocol;

// Lattice values and storage
pub mod lattice;

// Key placement and replication
pub mod placement;

// Message transport
pub mod net;

// Worker tasks
pub mod worker;

// Router tasks
pub mod router;

// CLI
pub mod cli;

// Re-exports for convenience
pub use self::core::{config, error, runtime, time};
pub use lattice::{registry, store, values};
pub use placement::{local, node, replication, resolve, ring, tier};

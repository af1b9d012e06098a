//! Core runtime infrastructure.
//!
//! - [`config`] - Configuration parsing and validation
//! - [`error`] - Error types and result aliases
//! - [`runtime`] - Task spawning and lifecycle
//! - [`time`] - Millisecond timestamps and windows

pub mod config;
pub mod error;
pub mod runtime;
pub mod time;

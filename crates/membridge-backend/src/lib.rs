//! # membridge-backend
//!
//! The polymorphic `MemoryBackend` seam: the interface the
//! host's agent loop is meant to depend on, with [`StoreMemoryBackend`] as
//! this subsystem's one implementation over the store. Wires together the
//! Write Bridge (C4) and Read Pipeline (C6) behind a single facade so the
//! host never constructs `membridge-client`/`membridge-outbox`/
//! `membridge-sessions` types directly.

#![deny(unsafe_code)]

pub mod backend;
pub mod status;

pub use backend::{MemoryBackend, StoreMemoryBackend};
pub use status::BackendStatus;

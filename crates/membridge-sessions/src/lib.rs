//! # membridge-sessions
//!
//! The Session Link Registry (C3): the persistent mapping from a host
//! `sessionKey` to store session metadata (`storeSessionId`,
//! `lastSyncedSeq`, `lastCommitAt`). Lazily creates the store-side session
//! on first write and never destroys the mapping.

#![deny(unsafe_code)]

pub mod registry;
pub mod types;

pub use registry::{session_store_path, SessionLinkRegistry};
pub use types::SessionRecord;

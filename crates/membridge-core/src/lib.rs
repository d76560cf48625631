//! # membridge-core
//!
//! Foundation types shared by every memory-bridge crate: branded ids, the
//! [`errors::MemoryError`] hierarchy, backoff math, and content hygiene.
//!
//! This crate has no knowledge of HTTP, the filesystem, or any other
//! component — it is the shared vocabulary the rest of the subsystem
//! depends on, the same foundational role a host runtime's own core types
//! crate plays for its agent loop.

#![deny(unsafe_code)]

pub mod clock;
pub mod errors;
pub mod ids;
pub mod model;
pub mod paths;
pub mod retry;
pub mod truncate;

pub use clock::now_ms;
pub use errors::MemoryError;
pub use ids::{AgentId, EventId, OutboxItemId, SessionKey, StoreSessionId};
pub use paths::{atomic_temp_path, expand_home};
pub use model::{
    CandidateOrigin, ContextKind, EventRole, OutboxItem, RankingCandidate, SessionEvent,
    SessionLink, StoreContext,
};
pub use truncate::{hygienic_message_content, trim_with_ellipsis, MAX_MESSAGE_CONTENT_CHARS, TRUNCATION_MARKER};

//! # membridge-outbox
//!
//! The durable write-ahead Outbox (C2): an ordered, at-least-once queue of
//! event batches backed by a single append-oriented file, with single-flight
//! flush and exponential backoff. Everything above this crate enqueues
//! events through [`Outbox`] rather than calling the store directly, so a
//! store outage never blocks a host turn.

#![deny(unsafe_code)]

pub mod outbox;
pub mod sender;
pub mod stats;

pub use outbox::Outbox;
pub use sender::OutboxSender;
pub use stats::OutboxStats;

//! # membridge-bridge
//!
//! The Write Bridge (C4): translates host conversation events into
//! [`membridge_core::SessionEvent`]s, queues them through C2/C3, and fires
//! commit triggers. Follows a fail-silent dependency-injection posture —
//! every effect that is not the direct return value of
//! [`bridge::WriteBridge::enqueue_message`],
//! [`bridge::WriteBridge::enqueue_tool_result`], or
//! [`bridge::WriteBridge::enqueue_commit`] is fail-silent: logged, folded
//! into stats, never propagated to the caller.

#![deny(unsafe_code)]

pub mod bridge;
pub mod registry;
pub mod sender;
pub mod stats;

pub use bridge::{EnqueueOutcome, WriteBridge};
pub use registry::BridgeRegistry;
pub use sender::ClientOutboxSender;
pub use stats::BridgeStats;

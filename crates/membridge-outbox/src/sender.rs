//! The delivery side the outbox drives on flush.

use async_trait::async_trait;
use membridge_core::{MemoryError, OutboxItem};

/// Delivers one outbox item to the store.
///
/// Kept as a narrow trait (rather than depending on `membridge-client`
/// directly) so the outbox can be tested with a fake sender and reused by
/// anything that needs at-least-once delivery, not only the write bridge.
#[async_trait]
pub trait OutboxSender: Send + Sync {
    /// Attempt delivery of a single item's events. Transport failures should
    /// map to [`MemoryError::Transport`] so the outbox knows to retry.
    async fn send(&self, item: &OutboxItem) -> Result<(), MemoryError>;
}

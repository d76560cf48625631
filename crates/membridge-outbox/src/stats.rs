//! The operator-facing snapshot returned by `getStats()`.

use serde::Serialize;

/// A point-in-time snapshot of one outbox's health.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxStats {
    /// Items currently queued (pending delivery).
    pub depth: u64,
    /// Age, in milliseconds, of the oldest queued item; `None` if empty.
    pub oldest_item_age_ms: Option<i64>,
    /// Items whose `next_attempt_at` has already elapsed.
    pub items_ready: u64,
    /// Milliseconds until the soonest not-yet-ready item becomes ready.
    pub time_until_next_ready_ms: Option<i64>,
    /// Wall-clock duration of the last completed flush cycle, in milliseconds.
    pub last_flush_duration_ms: Option<u64>,
    /// Items the last flush cycle delivered successfully.
    pub last_flush_success_count: u64,
    /// Items the last flush cycle failed to deliver.
    pub last_flush_error_count: u64,
    /// Total items ever enqueued.
    pub total_enqueued: u64,
    /// Total items ever delivered successfully.
    pub total_sent: u64,
    /// Total delivery attempts that failed (an item can fail more than once).
    pub total_failed: u64,
    /// The most recent delivery error message, if any.
    pub last_error: Option<String>,
    /// Highest `attempts` count among currently queued items.
    pub max_attempts: u32,
}

//! The operator-facing per-(agentId, endpoint) snapshot returned by
//! `WriteBridge::stats()`.

use membridge_config::CommitMode;
use serde::Serialize;

/// A point-in-time snapshot of one write bridge's activity.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStats {
    /// Total events handed to the outbox or store across all kinds.
    pub events_queued: u64,
    /// Of `events_queued`, how many were `message` events.
    pub message_events_queued: u64,
    /// Of `events_queued`, how many were `tool_result` events.
    pub tool_events_queued: u64,
    /// Of `events_queued`, how many were `commit` events (async commits only).
    pub commit_events_queued: u64,
    /// Commits dispatched in sync mode (direct `commitSession` call).
    pub sync_commits: u64,
    /// Commits dispatched in async mode (queued as a commit event).
    pub async_commits: u64,
    /// Periodic commits fired by the `everyNMessages` threshold.
    pub periodic_commits_by_message: u64,
    /// Periodic commits fired by the `everyNMinutes` threshold.
    pub periodic_commits_by_time: u64,
    /// Commits fired by a `session_end` cause.
    pub session_end_commits: u64,
    /// Commits fired by a `reset` cause.
    pub reset_commits: u64,
    /// Commits fired by any other (caller-supplied, "manual") cause.
    pub manual_commits: u64,
    /// Cause of the most recent commit, if any (`session_end`/`reset`/`periodic`/`manual`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_commit_cause: Option<String>,
    /// Source of the most recent commit (`message-threshold`/`time-threshold`/caller-supplied).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_commit_source: Option<String>,
    /// Dispatch mode of the most recent commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_commit_mode: Option<CommitMode>,
    /// Milliseconds between the last queued event and the commit that followed it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_commit_lag_ms: Option<i64>,
    /// Millis since epoch of the last event enqueued (of any kind).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event_queued_at: Option<i64>,
    /// Which periodic trigger last fired (`message-threshold`/`time-threshold`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_periodic_trigger: Option<String>,
    /// Millis since epoch the last periodic trigger fired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_periodic_trigger_at: Option<i64>,
    /// The most recent enqueue/commit error message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

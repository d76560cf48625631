//! The operator-facing snapshot returned by [`crate::MemoryBackend::status`].

use membridge_bridge::BridgeStats;
use membridge_outbox::OutboxStats;
use membridge_read::DiagnosticsSnapshot;
use serde::Serialize;

/// A point-in-time snapshot of one backend instance's health, combining the
/// write bridge's counters, the outbox's queue health (if one backs it),
/// and the read pipeline's last-search diagnostics.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendStatus {
    /// The agent this backend instance is bound to.
    pub agent_id: String,
    /// The store endpoint this backend instance talks to.
    pub endpoint: String,
    /// Write-path activity since this backend was constructed.
    pub bridge: BridgeStats,
    /// Outbox queue health, or `None` when the outbox is disabled and
    /// writes dispatch synchronously.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbox: Option<OutboxStats>,
    /// Diagnostics from the most recent `search` call, if any has run.
    pub last_search: DiagnosticsSnapshot,
}

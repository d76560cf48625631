//! The Write Bridge (C4).

use std::collections::HashMap;
use std::sync::Arc;

use membridge_client::StoreClient;
use membridge_config::{CommitMode, MemoryConfig};
use membridge_core::{
    hygienic_message_content, now_ms, EventId, EventRole, MemoryError, SessionEvent, SessionKey,
    StoreSessionId,
};
use membridge_outbox::Outbox;
use membridge_sessions::SessionLinkRegistry;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::stats::BridgeStats;

/// Result of an `enqueue_*` call. Never an error: a rejected enqueue is a
/// `NotQueued` outcome, not a failure, so a caller never needs to branch on
/// `Result` for the common no-op paths (backend disabled, no session link yet).
#[derive(Clone, Debug, PartialEq)]
pub enum EnqueueOutcome {
    /// The event(s) were accepted. `depth` is the outbox queue depth when
    /// queued through C2, or `None` when dispatched synchronously.
    Queued {
        /// Outbox depth immediately after this enqueue, if queued through C2.
        depth: Option<u64>,
    },
    /// Nothing was queued; `reason` explains why (not an error condition).
    NotQueued {
        /// Human-readable reason, also recorded as `last_error` in stats.
        reason: String,
    },
}

/// Translates host conversation events into store events, queues them
/// through the outbox (or sends them synchronously when the outbox is
/// disabled), and evaluates commit triggers. One instance per `(agentId,
/// endpoint)`, normally obtained through [`crate::registry::BridgeRegistry`].
pub struct WriteBridge {
    config: MemoryConfig,
    client: Arc<dyn StoreClient>,
    sessions: Arc<SessionLinkRegistry>,
    outbox: Option<Arc<Outbox>>,
    stats: Mutex<BridgeStats>,
}

impl WriteBridge {
    /// Construct a bridge over its dependencies. `outbox` should be `None`
    /// when `config.outbox.enabled` is `false`, in which case every enqueue
    /// dispatches synchronously through `client`.
    #[must_use]
    pub fn new(
        config: MemoryConfig,
        client: Arc<dyn StoreClient>,
        sessions: Arc<SessionLinkRegistry>,
        outbox: Option<Arc<Outbox>>,
    ) -> Self {
        Self {
            config,
            client,
            sessions,
            outbox,
            stats: Mutex::new(BridgeStats::default()),
        }
    }

    /// Queue a user or assistant message. Empty content (after hygiene
    /// trimming) is not queued.
    pub async fn enqueue_message(
        &self,
        session_key: &SessionKey,
        role: EventRole,
        content: &str,
        metadata: HashMap<String, String>,
    ) -> EnqueueOutcome {
        let hygienic = hygienic_message_content(content);
        if hygienic.is_empty() {
            return EnqueueOutcome::NotQueued {
                reason: "empty message content".into(),
            };
        }
        let event = SessionEvent::Message {
            event_id: EventId::new(),
            role,
            content: hygienic,
            metadata,
        };
        self.enqueue_non_commit(session_key, vec![event]).await
    }

    /// Queue a tool invocation result.
    pub async fn enqueue_tool_result(
        &self,
        session_key: &SessionKey,
        content: Value,
        metadata: HashMap<String, String>,
    ) -> EnqueueOutcome {
        let event = SessionEvent::ToolResult {
            event_id: EventId::new(),
            content,
            metadata,
        };
        self.enqueue_non_commit(session_key, vec![event]).await
    }

    /// Fire a commit. `cause` is one of `session_end`, `reset`, or a
    /// caller-supplied label (folded into the `manual` stats bucket);
    /// `source` is a free-text label carried into stats and logs.
    ///
    /// A `session_end`/`reset` commit whose corresponding trigger is
    /// disabled is rejected with [`MemoryError::Validation`] — unlike every
    /// other bridge effect, this one surfaces loudly because it reflects a
    /// caller mistake (calling a disabled commit path), not a transient
    /// backend condition. A sync-mode commit's transport/protocol failure
    /// also surfaces as-is, since the caller is blocked on its result.
    pub async fn enqueue_commit(
        &self,
        session_key: &SessionKey,
        cause: &str,
        source: &str,
    ) -> Result<EnqueueOutcome, MemoryError> {
        if cause == "session_end" && !self.config.commit.triggers.session_end {
            return Err(MemoryError::Validation(
                "session_end commits are disabled by commit.triggers.sessionEnd".into(),
            ));
        }
        if cause == "reset" && !self.config.commit.triggers.reset {
            return Err(MemoryError::Validation(
                "reset commits are disabled by commit.triggers.reset".into(),
            ));
        }
        self.enqueue_commit_raw(session_key, cause, source).await
    }

    /// Snapshot of this bridge's activity since construction.
    pub async fn stats(&self) -> BridgeStats {
        self.stats.lock().await.clone()
    }

    /// Stop the underlying outbox's flush timer, if one is running. A no-op
    /// when this bridge dispatches synchronously.
    pub async fn stop_outbox(&self) {
        if let Some(outbox) = &self.outbox {
            outbox.stop().await;
        }
    }

    /// Snapshot of the underlying outbox's health, or `None` when this
    /// bridge dispatches synchronously (no outbox backs it).
    pub async fn outbox_stats(&self) -> Option<membridge_outbox::OutboxStats> {
        match &self.outbox {
            Some(outbox) => Some(outbox.get_stats().await),
            None => None,
        }
    }

    /// Force an out-of-cycle flush of the underlying outbox, if one backs
    /// this bridge. A no-op when dispatching synchronously, since there is
    /// nothing queued to drain.
    pub async fn flush_outbox(&self) {
        if let Some(outbox) = &self.outbox {
            outbox.flush().await;
        }
    }

    async fn enqueue_non_commit(
        &self,
        session_key: &SessionKey,
        events: Vec<SessionEvent>,
    ) -> EnqueueOutcome {
        if !self.config.enabled || !self.config.dual_write {
            return EnqueueOutcome::NotQueued {
                reason: "memory bridge is not enabled for writes".into(),
            };
        }

        let session_id = match self.sessions.ensure_link(session_key, self.client.as_ref()).await {
            Ok(id) => id,
            Err(e) => {
                self.record_error(&e).await;
                return EnqueueOutcome::NotQueued { reason: e.to_string() };
            }
        };

        let depth = match self.dispatch(session_key, &session_id, events.clone()).await {
            Ok(depth) => depth,
            Err(e) => {
                self.record_error(&e).await;
                return EnqueueOutcome::NotQueued { reason: e.to_string() };
            }
        };

        self.record_enqueue_stats(&events).await;
        self.sessions.bump_seq(session_key, events.len() as u64).await;
        self.evaluate_commit_triggers(session_key).await;

        EnqueueOutcome::Queued { depth }
    }

    async fn enqueue_commit_raw(
        &self,
        session_key: &SessionKey,
        cause: &str,
        source: &str,
    ) -> Result<EnqueueOutcome, MemoryError> {
        if !self.config.enabled || !self.config.dual_write {
            return Ok(EnqueueOutcome::NotQueued {
                reason: "memory bridge is not enabled for writes".into(),
            });
        }

        let session_id = match self.sessions.ensure_link(session_key, self.client.as_ref()).await {
            Ok(id) => id,
            Err(e) => {
                self.record_error(&e).await;
                return Ok(EnqueueOutcome::NotQueued { reason: e.to_string() });
            }
        };

        let outcome = match self.config.commit.mode {
            CommitMode::Sync => {
                self.client.commit_session(session_id.as_str(), cause).await?;
                EnqueueOutcome::Queued { depth: None }
            }
            CommitMode::Async => {
                let event = SessionEvent::Commit {
                    event_id: EventId::new(),
                    cause: cause.to_owned(),
                    metadata: HashMap::new(),
                };
                let depth = self.dispatch(session_key, &session_id, vec![event]).await?;
                EnqueueOutcome::Queued { depth }
            }
        };

        self.record_commit_stats(cause, source, self.config.commit.mode).await;
        self.sessions.mark_commit_queued(session_key).await;
        Ok(outcome)
    }

    /// Evaluate periodic commit triggers after a non-commit enqueue. Always
    /// fail-silent: a failed periodic commit is logged and folded into
    /// stats, never surfaced, since it is a side effect of an enqueue call
    /// the caller already considers successful.
    async fn evaluate_commit_triggers(&self, session_key: &SessionKey) {
        let Some(link) = self.sessions.get(session_key).await else {
            return;
        };

        let every_n_messages = self.config.commit.triggers.every_n_messages;
        if every_n_messages > 0 && link.last_synced_seq % u64::from(every_n_messages) == 0 {
            self.fire_periodic_commit(session_key, "message-threshold").await;
            return;
        }

        let every_n_minutes = self.config.commit.triggers.every_n_minutes;
        if every_n_minutes > 0 && link.last_commit_at > 0 {
            let elapsed_ms = now_ms() - link.last_commit_at;
            if elapsed_ms >= i64::from(every_n_minutes) * 60_000 {
                self.fire_periodic_commit(session_key, "time-threshold").await;
            }
        }
    }

    async fn fire_periodic_commit(&self, session_key: &SessionKey, source: &str) {
        if let Err(e) = self.enqueue_commit_raw(session_key, "periodic", source).await {
            self.record_error(&e).await;
            tracing::warn!(
                session_key = session_key.as_str(),
                source,
                error = %e,
                "periodic commit trigger failed"
            );
        }
    }

    async fn dispatch(
        &self,
        session_key: &SessionKey,
        session_id: &StoreSessionId,
        events: Vec<SessionEvent>,
    ) -> Result<Option<u64>, MemoryError> {
        if let Some(outbox) = &self.outbox {
            let depth = outbox
                .enqueue(session_key.clone(), Some(session_id.clone()), events)
                .await?;
            Ok(Some(depth))
        } else {
            let values: Vec<Value> = events.iter().map(serde_json::to_value).collect::<Result<_, _>>()?;
            self.client.add_events_batch(session_id.as_str(), &values).await?;
            Ok(None)
        }
    }

    async fn record_enqueue_stats(&self, events: &[SessionEvent]) {
        let mut stats = self.stats.lock().await;
        stats.events_queued += events.len() as u64;
        for event in events {
            match event {
                SessionEvent::Message { .. } => stats.message_events_queued += 1,
                SessionEvent::ToolResult { .. } => stats.tool_events_queued += 1,
                SessionEvent::Commit { .. } => stats.commit_events_queued += 1,
            }
        }
        stats.last_event_queued_at = Some(now_ms());
    }

    async fn record_commit_stats(&self, cause: &str, source: &str, mode: CommitMode) {
        let mut stats = self.stats.lock().await;
        // Sync commits enqueue nothing, but this counter tracks "commits
        // observed by the bridge," not strictly events enqueued — preserved
        // from the source behavior.
        stats.commit_events_queued += 1;
        match mode {
            CommitMode::Sync => stats.sync_commits += 1,
            CommitMode::Async => stats.async_commits += 1,
        }
        match (cause, source) {
            ("periodic", "message-threshold") => stats.periodic_commits_by_message += 1,
            ("periodic", "time-threshold") => stats.periodic_commits_by_time += 1,
            ("session_end", _) => stats.session_end_commits += 1,
            ("reset", _) => stats.reset_commits += 1,
            _ => stats.manual_commits += 1,
        }

        let now = now_ms();
        if let Some(last_event_at) = stats.last_event_queued_at {
            stats.last_commit_lag_ms = Some(now - last_event_at);
        }
        stats.last_commit_cause = Some(cause.to_owned());
        stats.last_commit_source = Some(source.to_owned());
        stats.last_commit_mode = Some(mode);
        if cause == "periodic" {
            stats.last_periodic_trigger = Some(source.to_owned());
            stats.last_periodic_trigger_at = Some(now);
        }
    }

    async fn record_error(&self, err: &MemoryError) {
        let mut stats = self.stats.lock().await;
        stats.last_error = Some(err.to_string());
    }
}

//! The durable write-ahead outbox (C2).
//!
//! A failed send is requeued with backoff only when
//! `MemoryError::is_retryable()` says so; a non-retryable failure (policy,
//! protocol, validation, config) is dropped after one attempt rather than
//! retried forever.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use membridge_core::{atomic_temp_path, now_ms, MemoryError, OutboxItem, SessionEvent};
use membridge_core::{OutboxItemId, SessionKey, StoreSessionId};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::sender::OutboxSender;
use crate::stats::OutboxStats;

struct State {
    items: Vec<OutboxItem>,
    total_enqueued: u64,
    total_sent: u64,
    total_failed: u64,
    last_error: Option<String>,
    last_flush_duration_ms: Option<u64>,
    last_flush_success_count: u64,
    last_flush_error_count: u64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total_enqueued: 0,
            total_sent: 0,
            total_failed: 0,
            last_error: None,
            last_flush_duration_ms: None,
            last_flush_success_count: 0,
            last_flush_error_count: 0,
        }
    }
}

/// Durable, ordered, at-least-once outbox. One instance per `(agentId,
/// endpoint)`, backed by a single append-oriented file.
pub struct Outbox {
    path: PathBuf,
    flush_interval_ms: u64,
    max_batch_size: u32,
    retry_base_ms: u64,
    retry_max_ms: u64,
    sender: Arc<dyn OutboxSender>,
    state: Mutex<State>,
    flushing: AtomicBool,
    timer: Mutex<Option<JoinHandle<()>>>,
    shutdown: Arc<Notify>,
}

impl Outbox {
    /// Construct a new outbox. Call [`Outbox::start`] before relying on it.
    pub fn new(
        path: impl Into<PathBuf>,
        flush_interval_ms: u64,
        max_batch_size: u32,
        retry_base_ms: u64,
        retry_max_ms: u64,
        sender: Arc<dyn OutboxSender>,
    ) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            flush_interval_ms,
            max_batch_size,
            retry_base_ms,
            retry_max_ms,
            sender,
            state: Mutex::new(State::default()),
            flushing: AtomicBool::new(false),
            timer: Mutex::new(None),
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// Load persisted items, skipping corrupt lines, then begin the
    /// periodic flush timer.
    pub async fn start(self: &Arc<Self>) {
        self.load().await;
        tracing::info!(path = %self.path.display(), depth = self.state.lock().await.items.len(), "outbox started");

        let interval_ms = self.flush_interval_ms.max(1);
        let this = Arc::clone(self);
        let shutdown = Arc::clone(&self.shutdown);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_millis(interval_ms));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        this.flush().await;
                    }
                    () = shutdown.notified() => {
                        break;
                    }
                }
            }
        });
        *self.timer.lock().await = Some(handle);
    }

    /// Cancel the periodic timer. Cooperative: an in-flight flush, if any,
    /// completes because the timer task only reacts to the shutdown signal
    /// between ticks, never while `flush()` is executing.
    pub async fn stop(&self) {
        self.shutdown.notify_waiters();
        if let Some(handle) = self.timer.lock().await.take() {
            let _ = handle.await;
        }
        tracing::info!(path = %self.path.display(), "outbox stopped");
    }

    /// Append an item and persist immediately. Returns the new queue depth.
    pub async fn enqueue(
        &self,
        session_key: SessionKey,
        session_id: Option<StoreSessionId>,
        events: Vec<SessionEvent>,
    ) -> Result<u64, MemoryError> {
        let now = now_ms();
        let item = OutboxItem {
            id: OutboxItemId::new(),
            created_at: now,
            updated_at: now,
            attempts: 0,
            next_attempt_at: now,
            session_key,
            session_id,
            events,
        };

        let mut state = self.state.lock().await;
        state.items.push(item);
        state.total_enqueued += 1;
        let snapshot: Vec<OutboxItem> = state.items.clone();
        let depth = snapshot.len() as u64;
        drop(state);

        self.persist(&snapshot).await?;
        Ok(depth)
    }

    /// Drain ready items under a single-flight lock. A no-op if a flush is
    /// already in progress.
    pub async fn flush(&self) {
        if self
            .flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let _guard = FlushGuard(&self.flushing);
        self.flush_inner().await;
    }

    async fn flush_inner(&self) {
        let started = Instant::now();
        let now = now_ms();
        let mut success = 0u64;
        let mut errors = 0u64;
        let mut last_error = None;

        let mut state = self.state.lock().await;
        let mut keep = Vec::with_capacity(state.items.len());
        let mut changed = false;

        for mut item in std::mem::take(&mut state.items) {
            if success >= u64::from(self.max_batch_size) || item.next_attempt_at > now {
                keep.push(item);
                continue;
            }

            match self.sender.send(&item).await {
                Ok(()) => {
                    success += 1;
                    changed = true;
                }
                Err(err) => {
                    errors += 1;
                    changed = true;
                    last_error = Some(err.to_string());
                    if err.is_retryable() {
                        item.attempts += 1;
                        item.updated_at = now_ms();
                        item.next_attempt_at = now
                            + membridge_core::retry::backoff_delay_ms(
                                item.attempts,
                                self.retry_base_ms,
                                self.retry_max_ms,
                            ) as i64;
                        keep.push(item);
                    } else {
                        tracing::warn!(
                            item_id = item.id.as_str(),
                            error = %err,
                            "dropping outbox item after non-retryable error"
                        );
                    }
                }
            }
        }

        state.items = keep;
        state.total_sent += success;
        state.total_failed += errors;
        if last_error.is_some() {
            state.last_error = last_error;
        }
        state.last_flush_duration_ms = Some(started.elapsed().as_millis() as u64);
        state.last_flush_success_count = success;
        state.last_flush_error_count = errors;
        let snapshot = state.items.clone();
        drop(state);

        if changed {
            if let Err(e) = self.persist(&snapshot).await {
                tracing::warn!(error = %e, "failed to persist outbox after flush");
            }
        }

        if success > 0 || errors > 0 {
            tracing::debug!(success, errors, depth = snapshot.len(), "outbox flush cycle complete");
        }
    }

    /// Current health snapshot.
    pub async fn get_stats(&self) -> OutboxStats {
        let state = self.state.lock().await;
        let now = now_ms();

        let oldest_item_age_ms = state.items.iter().map(|i| i.created_at).min().map(|c| now - c);
        let items_ready = state.items.iter().filter(|i| i.is_ready(now)).count() as u64;
        let time_until_next_ready_ms = state
            .items
            .iter()
            .filter(|i| !i.is_ready(now))
            .map(|i| i.next_attempt_at - now)
            .min();
        let max_attempts = state.items.iter().map(|i| i.attempts).max().unwrap_or(0);

        OutboxStats {
            depth: state.items.len() as u64,
            oldest_item_age_ms,
            items_ready,
            time_until_next_ready_ms,
            last_flush_duration_ms: state.last_flush_duration_ms,
            last_flush_success_count: state.last_flush_success_count,
            last_flush_error_count: state.last_flush_error_count,
            total_enqueued: state.total_enqueued,
            total_sent: state.total_sent,
            total_failed: state.total_failed,
            last_error: state.last_error.clone(),
            max_attempts,
        }
    }

    async fn load(&self) {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read outbox file");
                return;
            }
        };

        let mut items = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<OutboxItem>(line) {
                Ok(item) => items.push(item),
                Err(e) => {
                    tracing::warn!(line = lineno, error = %e, "dropping corrupt outbox line");
                }
            }
        }

        let mut state = self.state.lock().await;
        state.total_enqueued = items.len() as u64;
        state.items = items;
    }

    async fn persist(&self, items: &[OutboxItem]) -> Result<(), MemoryError> {
        let mut buf = String::new();
        for item in items {
            let line = serde_json::to_string(item)?;
            buf.push_str(&line);
            buf.push('\n');
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = atomic_temp_path(&self.path);
        tokio::fs::write(&tmp, buf).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use membridge_core::EventRole;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex as StdMutex;

    struct FailingSender;
    #[async_trait::async_trait]
    impl OutboxSender for FailingSender {
        async fn send(&self, _item: &OutboxItem) -> Result<(), MemoryError> {
            Err(MemoryError::Transport("store down".into()))
        }
    }

    struct SucceedingSender {
        delivered: StdMutex<Vec<OutboxItemId>>,
    }
    #[async_trait::async_trait]
    impl OutboxSender for SucceedingSender {
        async fn send(&self, item: &OutboxItem) -> Result<(), MemoryError> {
            self.delivered.lock().unwrap().push(item.id.clone());
            Ok(())
        }
    }

    struct PermanentlyFailingSender;
    #[async_trait::async_trait]
    impl OutboxSender for PermanentlyFailingSender {
        async fn send(&self, _item: &OutboxItem) -> Result<(), MemoryError> {
            Err(MemoryError::Validation("bad event shape".into()))
        }
    }

    struct CountingFailSender {
        fail_times: AtomicU32,
    }
    #[async_trait::async_trait]
    impl OutboxSender for CountingFailSender {
        async fn send(&self, _item: &OutboxItem) -> Result<(), MemoryError> {
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                Err(MemoryError::Transport("not yet".into()))
            } else {
                Ok(())
            }
        }
    }

    fn message_event() -> SessionEvent {
        SessionEvent::Message {
            event_id: membridge_core::EventId::new(),
            role: EventRole::User,
            content: "hi".into(),
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn enqueue_then_flush_delivers_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.jsonl");
        let sender = Arc::new(SucceedingSender { delivered: StdMutex::new(Vec::new()) });
        let outbox = Outbox::new(path, 60_000, 50, 1_000, 60_000, sender.clone());
        outbox.start().await;

        outbox
            .enqueue(SessionKey::from_string("s1"), None, vec![message_event()])
            .await
            .unwrap();
        outbox
            .enqueue(SessionKey::from_string("s1"), None, vec![message_event()])
            .await
            .unwrap();

        outbox.flush().await;
        let stats = outbox.get_stats().await;
        assert_eq!(stats.depth, 0);
        assert_eq!(stats.total_sent, 2);
        assert_eq!(sender.delivered.lock().unwrap().len(), 2);
        outbox.stop().await;
    }

    #[tokio::test]
    async fn failed_item_backs_off_and_does_not_block_stats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.jsonl");
        let sender = Arc::new(FailingSender);
        let outbox = Outbox::new(path, 60_000, 50, 1_000, 60_000, sender);
        outbox.start().await;

        outbox
            .enqueue(SessionKey::from_string("s1"), None, vec![message_event()])
            .await
            .unwrap();
        outbox.flush().await;

        let stats = outbox.get_stats().await;
        assert_eq!(stats.depth, 1);
        assert_eq!(stats.total_failed, 1);
        assert_eq!(stats.max_attempts, 1);
        assert!(stats.items_ready == 0);
        assert!(stats.time_until_next_ready_ms.unwrap() > 0);
        outbox.stop().await;
    }

    #[tokio::test]
    async fn non_retryable_error_drops_item_instead_of_backing_off() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.jsonl");
        let sender = Arc::new(PermanentlyFailingSender);
        let outbox = Outbox::new(path, 60_000, 50, 1_000, 60_000, sender);
        outbox.start().await;

        outbox
            .enqueue(SessionKey::from_string("s1"), None, vec![message_event()])
            .await
            .unwrap();
        outbox.flush().await;

        let stats = outbox.get_stats().await;
        assert_eq!(stats.depth, 0);
        assert_eq!(stats.total_failed, 1);
        outbox.stop().await;
    }

    #[tokio::test]
    async fn cold_restart_drains_persisted_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.jsonl");

        let failing = Arc::new(FailingSender);
        let first = Outbox::new(path.clone(), 60_000, 50, 1_000, 60_000, failing);
        first.start().await;
        first
            .enqueue(SessionKey::from_string("s1"), None, vec![message_event()])
            .await
            .unwrap();
        first.stop().await;
        assert_eq!(first.get_stats().await.depth, 1);

        let succeeding = Arc::new(SucceedingSender { delivered: StdMutex::new(Vec::new()) });
        let second = Outbox::new(path, 60_000, 50, 1_000, 60_000, succeeding.clone());
        second.start().await;
        second.flush().await;

        let stats = second.get_stats().await;
        assert_eq!(stats.depth, 0);
        assert_eq!(succeeding.delivered.lock().unwrap().len(), 1);
        second.stop().await;
    }

    #[tokio::test]
    async fn malformed_line_is_dropped_without_losing_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.jsonl");
        let good = OutboxItem {
            id: OutboxItemId::new(),
            created_at: now_ms(),
            updated_at: now_ms(),
            attempts: 0,
            next_attempt_at: now_ms(),
            session_key: SessionKey::from_string("s1"),
            session_id: None,
            events: vec![message_event()],
        };
        let content = format!("{}\nnot json\n", serde_json::to_string(&good).unwrap());
        tokio::fs::write(&path, content).await.unwrap();

        let sender = Arc::new(SucceedingSender { delivered: StdMutex::new(Vec::new()) });
        let outbox = Outbox::new(path, 60_000, 50, 1_000, 60_000, sender);
        outbox.start().await;
        assert_eq!(outbox.get_stats().await.depth, 1);
        outbox.stop().await;
    }

    #[tokio::test]
    async fn max_batch_size_caps_successes_per_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.jsonl");
        let sender = Arc::new(SucceedingSender { delivered: StdMutex::new(Vec::new()) });
        let outbox = Outbox::new(path, 60_000, 1, 1_000, 60_000, sender.clone());
        outbox.start().await;

        for _ in 0..3 {
            outbox
                .enqueue(SessionKey::from_string("s1"), None, vec![message_event()])
                .await
                .unwrap();
        }
        outbox.flush().await;

        let stats = outbox.get_stats().await;
        assert_eq!(stats.depth, 2);
        assert_eq!(stats.last_flush_success_count, 1);
        outbox.stop().await;
    }

    #[tokio::test]
    async fn eventually_succeeds_after_retries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.jsonl");
        let sender = Arc::new(CountingFailSender { fail_times: AtomicU32::new(1) });
        let outbox = Outbox::new(path, 60_000, 50, 0, 0, sender);
        outbox.start().await;
        outbox
            .enqueue(SessionKey::from_string("s1"), None, vec![message_event()])
            .await
            .unwrap();

        outbox.flush().await;
        assert_eq!(outbox.get_stats().await.depth, 1);

        outbox.flush().await;
        assert_eq!(outbox.get_stats().await.depth, 0);
        outbox.stop().await;
    }
}

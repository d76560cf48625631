//! The polymorphic `MemoryBackend` interface and this subsystem's one
//! implementation of it, [`StoreMemoryBackend`].
//!
//! The host supports more than one memory backend; this crate is the seam
//! where the host's agent loop is expected to depend on the trait, not on
//! any concrete store — the same way a provider-agnostic LLM client lets
//! callers depend on an interface rather than one vendor's SDK.

use std::sync::Arc;

use async_trait::async_trait;
use membridge_bridge::{BridgeRegistry, EnqueueOutcome, WriteBridge};
use membridge_client::HttpStoreClient;
use membridge_config::MemoryConfig;
use membridge_core::{AgentId, EventRole, MemoryError, SessionKey};
use membridge_read::{ReadFileResult, ReadOptions, ReadPipeline, ReadPipelineRegistry, ReadResultRow};
use membridge_sessions::{session_store_path, SessionLinkRegistry};
use serde_json::Value;
use std::collections::HashMap;

use crate::status::BackendStatus;

/// The retrieval interface the host's agent loop depends on, so it can
/// swap the store this subsystem talks to for any other memory backend
/// without the agent loop knowing the difference. This subsystem
/// ([`StoreMemoryBackend`]) is one implementation; a test double or a
/// different store product is another.
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// Run one complete retrieval and return ranked, budget-trimmed snippets.
    async fn search(&self, query: &str, options: ReadOptions) -> Result<Vec<ReadResultRow>, MemoryError>;

    /// Read a store file directly, optionally sliced to `[from, from+lines)`.
    async fn read_file(
        &self,
        rel_path: &str,
        from: Option<u32>,
        lines: Option<u32>,
    ) -> Result<ReadFileResult, MemoryError>;

    /// A point-in-time snapshot of this backend's write/read activity.
    async fn status(&self) -> BackendStatus;

    /// Force any buffered writes out now, best-effort. Never blocks on a
    /// store outage longer than the underlying outbox's own retry window
    /// would anyway; a failed flush is folded into the outbox's stats, not
    /// returned as an error, since `sync` is a nudge, not a guarantee.
    async fn sync(&self) -> Result<(), MemoryError>;

    /// Whether the store's embedding/VLM pipeline currently reports healthy.
    /// Never propagates a transport failure — an unreachable store probes
    /// as unavailable, not as an error.
    async fn probe_embedding_availability(&self) -> bool;

    /// Whether the store's vector index currently reports healthy. Same
    /// fail-soft contract as [`MemoryBackend::probe_embedding_availability`].
    async fn probe_vector_availability(&self) -> bool;

    /// Release this backend's resources (stop the outbox flush timer).
    /// Idempotent; safe to call more than once.
    async fn close(&self);
}

/// This subsystem's [`MemoryBackend`] implementation: one [`ReadPipeline`]
/// and one [`WriteBridge`] sharing a `(agentId, endpoint)` identity, built
/// through the same memoized registries the bridge and read crates expose
/// on their own, so a host that constructs several `StoreMemoryBackend`s
/// for the same agent/endpoint pair shares their underlying outbox and
/// session registry rather than standing up duplicates.
pub struct StoreMemoryBackend {
    agent_id: AgentId,
    config: MemoryConfig,
    read: Arc<ReadPipeline>,
    write: Arc<WriteBridge>,
}

impl StoreMemoryBackend {
    /// Build a backend directly from its dependencies. Most callers should
    /// prefer [`StoreMemoryBackend::ensure`], which shares the process-wide
    /// registries instead of constructing fresh ones.
    #[must_use]
    pub fn new(agent_id: AgentId, config: MemoryConfig, read: Arc<ReadPipeline>, write: Arc<WriteBridge>) -> Self {
        Self { agent_id, config, read, write }
    }

    /// Build a backend for `(agent_id, config.endpoint)` using the given
    /// process-wide registries, constructing the underlying read pipeline
    /// and write bridge on first use and reusing them thereafter.
    pub async fn ensure(
        agent_id: AgentId,
        config: MemoryConfig,
        read_registry: &ReadPipelineRegistry,
        bridge_registry: &BridgeRegistry,
    ) -> Self {
        let read = read_registry.ensure(&agent_id, &config).await;
        let write = bridge_registry.ensure(&agent_id, &config).await;
        Self { agent_id, config, read, write }
    }

    /// Build a standalone backend (its own client, session registry, and
    /// outbox, not shared with any registry) over the default store client.
    /// Useful for one-off tooling and tests.
    pub async fn standalone(agent_id: AgentId, config: MemoryConfig) -> Self {
        let client: Arc<dyn membridge_client::StoreClient> = Arc::new(HttpStoreClient::new(&config));
        let sessions = Arc::new(SessionLinkRegistry::new(session_store_path()));
        sessions.load().await;

        let read = Arc::new(ReadPipeline::new(config.clone(), Arc::clone(&client), Arc::clone(&sessions)));

        let outbox = if config.outbox.enabled {
            let sender = Arc::new(membridge_bridge::ClientOutboxSender::new(Arc::clone(&client)));
            let outbox = membridge_outbox::Outbox::new(
                config.outbox.path.clone(),
                config.outbox.flush_interval_ms,
                config.outbox.max_batch_size,
                config.outbox.retry_base_ms,
                config.outbox.retry_max_ms,
                sender,
            );
            outbox.start().await;
            Some(outbox)
        } else {
            None
        };

        let write = Arc::new(WriteBridge::new(config.clone(), client, sessions, outbox));
        Self { agent_id, config, read, write }
    }

    /// Queue a user or assistant message. Passthrough to the underlying
    /// write bridge; not part of [`MemoryBackend`] since that interface
    /// covers only the read-side and lifecycle operations common to every
    /// backend variant.
    pub async fn enqueue_message(
        &self,
        session_key: &SessionKey,
        role: EventRole,
        content: &str,
        metadata: HashMap<String, String>,
    ) -> EnqueueOutcome {
        self.write.enqueue_message(session_key, role, content, metadata).await
    }

    /// Queue a tool invocation result. See [`StoreMemoryBackend::enqueue_message`].
    pub async fn enqueue_tool_result(
        &self,
        session_key: &SessionKey,
        content: Value,
        metadata: HashMap<String, String>,
    ) -> EnqueueOutcome {
        self.write.enqueue_tool_result(session_key, content, metadata).await
    }

    /// Fire an explicit commit. See [`StoreMemoryBackend::enqueue_message`].
    pub async fn enqueue_commit(
        &self,
        session_key: &SessionKey,
        cause: &str,
        source: &str,
    ) -> Result<EnqueueOutcome, MemoryError> {
        self.write.enqueue_commit(session_key, cause, source).await
    }
}

#[async_trait]
impl MemoryBackend for StoreMemoryBackend {
    async fn search(&self, query: &str, options: ReadOptions) -> Result<Vec<ReadResultRow>, MemoryError> {
        self.read.search(query, options).await
    }

    async fn read_file(
        &self,
        rel_path: &str,
        from: Option<u32>,
        lines: Option<u32>,
    ) -> Result<ReadFileResult, MemoryError> {
        self.read.read_file(rel_path, from, lines).await
    }

    async fn status(&self) -> BackendStatus {
        BackendStatus {
            agent_id: self.agent_id.as_str().to_owned(),
            endpoint: self.config.endpoint.clone(),
            bridge: self.write.stats().await,
            outbox: self.write.outbox_stats().await,
            last_search: self.read.diagnostics().await,
        }
    }

    async fn sync(&self) -> Result<(), MemoryError> {
        self.write.flush_outbox().await;
        Ok(())
    }

    async fn probe_embedding_availability(&self) -> bool {
        self.read.observer_vlm().await.is_ok()
    }

    async fn probe_vector_availability(&self) -> bool {
        self.read.observer_vikingdb().await.is_ok()
    }

    async fn close(&self) {
        self.write.stop_outbox().await;
    }
}

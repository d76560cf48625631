//! Per-`(agentId, endpoint)` memoized [`ReadPipeline`] instances.
//!
//! Mirrors `membridge_bridge::BridgeRegistry`: a `DashMap` keyed by
//! `(agentId, endpoint)` plus a creation-serializing lock, injectable rather
//! than a global static so tests never share hidden state.

use std::sync::Arc;

use dashmap::DashMap;
use membridge_client::HttpStoreClient;
use membridge_config::MemoryConfig;
use membridge_core::AgentId;
use membridge_sessions::{session_store_path, SessionLinkRegistry};
use tokio::sync::Mutex as AsyncMutex;

use crate::pipeline::ReadPipeline;

/// Process-wide registry of read pipelines, keyed by `(agentId, endpoint)`.
pub struct ReadPipelineRegistry {
    entries: DashMap<(String, String), Arc<ReadPipeline>>,
    creation_lock: AsyncMutex<()>,
}

impl Default for ReadPipelineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadPipelineRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            creation_lock: AsyncMutex::new(()),
        }
    }

    /// Return the memoized pipeline for `(agent_id, config.endpoint)`,
    /// constructing it on first use. A second call with the same key
    /// returns the same `Arc`, even if `config` differs slightly — config
    /// changes on a live pipeline require a fresh registry.
    pub async fn ensure(&self, agent_id: &AgentId, config: &MemoryConfig) -> Arc<ReadPipeline> {
        let key = (agent_id.as_str().to_owned(), config.endpoint.clone());
        if let Some(existing) = self.entries.get(&key) {
            return Arc::clone(existing.value());
        }

        let _guard = self.creation_lock.lock().await;
        if let Some(existing) = self.entries.get(&key) {
            return Arc::clone(existing.value());
        }

        let pipeline = Self::build(config).await;
        let _ = self.entries.insert(key, Arc::clone(&pipeline));
        pipeline
    }

    /// Drop every memoized pipeline, leaving the registry empty for a
    /// clean re-use in tests.
    pub fn clear(&self) {
        self.entries.clear();
    }

    async fn build(config: &MemoryConfig) -> Arc<ReadPipeline> {
        let client: Arc<dyn membridge_client::StoreClient> = Arc::new(HttpStoreClient::new(config));
        let sessions = Arc::new(SessionLinkRegistry::new(session_store_path()));
        sessions.load().await;
        Arc::new(ReadPipeline::new(config.clone(), client, sessions))
    }
}

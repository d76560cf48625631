//! Per-`(agentId, endpoint)` memoized [`WriteBridge`] instances.
//!
//! Keeps one `DashMap<String, Arc<WriteBridge>>` per running process rather
//! than a global static, so unrelated tests never share hidden state. Construction
//! races are resolved first-writer-wins via a creation-serializing lock,
//! matching [`membridge_sessions::SessionLinkRegistry::ensure_link`]'s own
//! immutable-once-set discipline.

use std::sync::Arc;

use dashmap::DashMap;
use membridge_client::HttpStoreClient;
use membridge_config::MemoryConfig;
use membridge_core::AgentId;
use membridge_outbox::Outbox;
use membridge_sessions::{session_store_path, SessionLinkRegistry};
use tokio::sync::Mutex as AsyncMutex;

use crate::bridge::WriteBridge;
use crate::sender::ClientOutboxSender;

/// Process-wide registry of write bridges, keyed by `(agentId, endpoint)`.
/// Injectable (construct one per test) rather than a global static.
pub struct BridgeRegistry {
    entries: DashMap<(String, String), Arc<WriteBridge>>,
    creation_lock: AsyncMutex<()>,
}

impl Default for BridgeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            creation_lock: AsyncMutex::new(()),
        }
    }

    /// Return the memoized bridge for `(agent_id, config.endpoint)`,
    /// constructing and starting it on first use. A second call with the
    /// same key returns the same `Arc`, even if `config` differs slightly —
    /// config changes on a live bridge require a fresh registry.
    pub async fn ensure(&self, agent_id: &AgentId, config: &MemoryConfig) -> Arc<WriteBridge> {
        let key = (agent_id.as_str().to_owned(), config.endpoint.clone());
        if let Some(existing) = self.entries.get(&key) {
            return Arc::clone(existing.value());
        }

        let _guard = self.creation_lock.lock().await;
        if let Some(existing) = self.entries.get(&key) {
            return Arc::clone(existing.value());
        }

        let bridge = Self::build(config).await;
        let _ = self.entries.insert(key, Arc::clone(&bridge));
        bridge
    }

    /// Stop every memoized bridge's outbox timer. Call once at process
    /// shutdown; leaves the registry empty for a clean re-use in tests.
    pub async fn shutdown(&self) {
        for entry in self.entries.iter() {
            entry.value().stop_outbox().await;
        }
        self.entries.clear();
    }

    async fn build(config: &MemoryConfig) -> Arc<WriteBridge> {
        let client: Arc<dyn membridge_client::StoreClient> = Arc::new(HttpStoreClient::new(config));

        let sessions = Arc::new(SessionLinkRegistry::new(session_store_path()));
        sessions.load().await;

        let outbox = if config.outbox.enabled {
            let sender = Arc::new(ClientOutboxSender::new(Arc::clone(&client)));
            let outbox = Outbox::new(
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

        Arc::new(WriteBridge::new(config.clone(), client, sessions, outbox))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_memoizes_by_agent_and_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var(
            "MEMORY_BRIDGE_SESSION_STORE_PATH",
            dir.path().join("sessions.json"),
        );
        let registry = BridgeRegistry::new();
        let mut config = MemoryConfig::default();
        config.outbox.enabled = false;
        let agent = AgentId::from("agent-1");

        let first = registry.ensure(&agent, &config).await;
        let second = registry.ensure(&agent, &config).await;
        assert!(Arc::ptr_eq(&first, &second));

        let other_agent = AgentId::from("agent-2");
        let third = registry.ensure(&other_agent, &config).await;
        assert!(!Arc::ptr_eq(&first, &third));

        std::env::remove_var("MEMORY_BRIDGE_SESSION_STORE_PATH");
    }
}

//! Adapts a [`StoreClient`] to the outbox's narrow [`OutboxSender`] contract.

use std::sync::Arc;

use async_trait::async_trait;
use membridge_client::StoreClient;
use membridge_core::{MemoryError, OutboxItem};
use membridge_outbox::OutboxSender;

/// Delivers an outbox item via `add_events_batch`, treating a missing
/// `session_id` as a protocol defect rather than a silent drop — the bridge
/// only ever enqueues items after a session link is established.
pub struct ClientOutboxSender {
    client: Arc<dyn StoreClient>,
}

impl ClientOutboxSender {
    /// Wrap `client` for use as an outbox sender.
    #[must_use]
    pub fn new(client: Arc<dyn StoreClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OutboxSender for ClientOutboxSender {
    async fn send(&self, item: &OutboxItem) -> Result<(), MemoryError> {
        let session_id = item.session_id.as_ref().ok_or_else(|| {
            MemoryError::Protocol("outbox item has no denormalized session id".into())
        })?;
        let events = item
            .events
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.client.add_events_batch(session_id.as_str(), &events).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use membridge_core::{EventId, EventRole, OutboxItemId, SessionEvent, SessionKey, StoreSessionId};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StoreClient for RecordingClient {
        async fn health(&self) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn create_session(&self) -> Result<String, MemoryError> {
            unimplemented!()
        }
        async fn list_sessions(&self) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn get_session(&self, _id: &str) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn delete_session(&self, _id: &str) -> Result<(), MemoryError> {
            unimplemented!()
        }
        async fn extract_session(&self, _id: &str) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn add_session_message(&self, _id: &str, _role: &str, _content: &str) -> Result<(), MemoryError> {
            unimplemented!()
        }
        async fn add_events_batch(&self, id: &str, events: &[serde_json::Value]) -> Result<(), MemoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(id, "store-sess-1");
            assert_eq!(events.len(), 1);
            Ok(())
        }
        async fn commit_session(&self, _id: &str, _cause: &str) -> Result<(), MemoryError> {
            unimplemented!()
        }
        async fn search(
            &self,
            _q: &str,
            _t: &str,
            _s: Option<&str>,
            _l: u32,
            _st: Option<f64>,
        ) -> Result<membridge_client::types::SearchResult, MemoryError> {
            unimplemented!()
        }
        async fn find(
            &self,
            _q: &str,
            _t: &str,
            _s: Option<&str>,
            _l: u32,
            _st: Option<f64>,
        ) -> Result<membridge_client::types::SearchResult, MemoryError> {
            unimplemented!()
        }
        async fn grep(&self, _uri: &str, _pattern: &str, _ci: bool) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn glob(&self, _pattern: &str, _uri: &str) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn read(&self, _uri: &str) -> Result<String, MemoryError> {
            unimplemented!()
        }
        async fn r#abstract(&self, _uri: &str) -> Result<String, MemoryError> {
            unimplemented!()
        }
        async fn overview(&self, _uri: &str) -> Result<String, MemoryError> {
            unimplemented!()
        }
        async fn add_resource(
            &self,
            _p: &str,
            _t: Option<&str>,
            _r: &str,
            _i: &str,
            _w: bool,
            _to: Option<u64>,
        ) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn add_skill(&self, _d: &serde_json::Value, _w: bool, _to: Option<u64>) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn wait_processed(&self, _to: Option<u64>) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn fs_ls(&self, _uri: &str) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn fs_tree(&self, _uri: &str) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn fs_stat(&self, _uri: &str) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn fs_mkdir(&self, _uri: &str) -> Result<(), MemoryError> {
            unimplemented!()
        }
        async fn fs_rm(&self, _uri: &str, _r: bool) -> Result<(), MemoryError> {
            unimplemented!()
        }
        async fn fs_mv(&self, _f: &str, _t: &str) -> Result<(), MemoryError> {
            unimplemented!()
        }
        async fn relations(&self, _uri: &str) -> Result<Vec<membridge_client::types::RelationEdge>, MemoryError> {
            unimplemented!()
        }
        async fn link_relation(&self, _f: &str, _t: &str, _r: Option<&str>) -> Result<(), MemoryError> {
            unimplemented!()
        }
        async fn unlink_relation(&self, _f: &str, _t: &str) -> Result<(), MemoryError> {
            unimplemented!()
        }
        async fn observer_queue(&self) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn observer_vikingdb(&self) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn observer_vlm(&self) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn observer_transaction(&self) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn observer_system(&self) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn pack_export(&self, _b: &serde_json::Value) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
        async fn pack_import(&self, _b: &serde_json::Value) -> Result<serde_json::Value, MemoryError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn send_forwards_events_to_add_events_batch() {
        let client: Arc<dyn StoreClient> = Arc::new(RecordingClient { calls: AtomicUsize::new(0) });
        let sender = ClientOutboxSender::new(Arc::clone(&client));
        let item = OutboxItem {
            id: OutboxItemId::new(),
            created_at: 0,
            updated_at: 0,
            attempts: 0,
            next_attempt_at: 0,
            session_key: SessionKey::from("s1"),
            session_id: Some(StoreSessionId::from("store-sess-1")),
            events: vec![SessionEvent::Message {
                event_id: EventId::new(),
                role: EventRole::User,
                content: "hi".into(),
                metadata: HashMap::new(),
            }],
        };

        sender.send(&item).await.unwrap();
    }

    #[tokio::test]
    async fn send_without_session_id_is_a_protocol_error() {
        let client: Arc<dyn StoreClient> = Arc::new(RecordingClient { calls: AtomicUsize::new(0) });
        let sender = ClientOutboxSender::new(client);
        let item = OutboxItem {
            id: OutboxItemId::new(),
            created_at: 0,
            updated_at: 0,
            attempts: 0,
            next_attempt_at: 0,
            session_key: SessionKey::from("s1"),
            session_id: None,
            events: vec![],
        };

        let err = sender.send(&item).await.unwrap_err();
        assert!(matches!(err, MemoryError::Protocol(_)));
    }
}

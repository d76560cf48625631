//! The Session Link Registry (C3).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use membridge_client::StoreClient;
use membridge_core::{atomic_temp_path, now_ms, MemoryError, SessionKey, SessionLink, StoreSessionId};
use tokio::sync::Mutex;

use crate::types::SessionRecord;

/// Default session-store path, overridable via `MEMORY_BRIDGE_SESSION_STORE_PATH`.
#[must_use]
pub fn session_store_path() -> PathBuf {
    if let Ok(p) = std::env::var("MEMORY_BRIDGE_SESSION_STORE_PATH") {
        if !p.is_empty() {
            return PathBuf::from(p);
        }
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_owned());
    PathBuf::from(home).join(".memory-bridge").join("sessions.json")
}

/// Owns the persistent mapping from host `sessionKey` to store session
/// metadata. One instance is shared per host agent process; reads are
/// non-blocking snapshots, writes are serialized through a single mutex
/// scoped to this registry's file (matching the outbox's own persist model).
pub struct SessionLinkRegistry {
    path: PathBuf,
    records: Mutex<HashMap<String, SessionRecord>>,
}

impl SessionLinkRegistry {
    /// Construct a registry over `path`, without touching disk yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Load persisted records from disk, replacing any in-memory state.
    /// A missing file is not an error; a malformed file is logged and
    /// treated as empty (the file is the source of truth, and a corrupt
    /// session store cannot be partially recovered field-by-field).
    pub async fn load(&self) {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read session store");
                return;
            }
        };

        match serde_json::from_str::<HashMap<String, SessionRecord>>(&content) {
            Ok(records) => {
                let mut guard = self.records.lock().await;
                *guard = records;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "session store file is malformed, starting empty");
            }
        }
    }

    /// Current linkage for `session_key`, if any record exists.
    pub async fn get(&self, session_key: &SessionKey) -> Option<SessionLink> {
        let guard = self.records.lock().await;
        guard.get(session_key.as_str()).map(SessionRecord::to_link)
    }

    /// Ensure a store session id exists for `session_key`, creating one via
    /// `client.create_session()` if this is the first write. Idempotent:
    /// once set, `store_session_id` never changes for a given key.
    pub async fn ensure_link(
        &self,
        session_key: &SessionKey,
        client: &dyn StoreClient,
    ) -> Result<StoreSessionId, MemoryError> {
        {
            let guard = self.records.lock().await;
            if let Some(existing) = guard.get(session_key.as_str()) {
                if let Some(id) = &existing.openviking_session_id {
                    return Ok(StoreSessionId::from_string(id.clone()));
                }
            }
        }

        let created = client.create_session().await?;
        let store_session_id = StoreSessionId::from_string(created);

        let mut guard = self.records.lock().await;
        let record = guard.entry(session_key.as_str().to_owned()).or_default();
        // Another concurrent ensure may have already linked this key while
        // we awaited `create_session`; immutability wins, first write stays.
        if record.openviking_session_id.is_none() {
            record.openviking_session_id = Some(store_session_id.as_str().to_owned());
            record.updated_at = now_ms();
        }
        let winner = record
            .openviking_session_id
            .clone()
            .unwrap_or_else(|| store_session_id.as_str().to_owned());
        let snapshot = guard.clone();
        drop(guard);
        self.persist(&snapshot).await;

        Ok(StoreSessionId::from_string(winner))
    }

    /// Increment `lastSyncedSeq` by `max(1, delta)`.
    pub async fn bump_seq(&self, session_key: &SessionKey, delta: u64) {
        let mut guard = self.records.lock().await;
        let record = guard.entry(session_key.as_str().to_owned()).or_default();
        record.last_synced_seq += delta.max(1);
        record.updated_at = now_ms();
        let snapshot = guard.clone();
        drop(guard);
        self.persist(&snapshot).await;
    }

    /// Set `lastCommitAt` to the current time.
    pub async fn mark_commit_queued(&self, session_key: &SessionKey) {
        let mut guard = self.records.lock().await;
        let record = guard.entry(session_key.as_str().to_owned()).or_default();
        record.last_commit_at = now_ms();
        record.updated_at = now_ms();
        let snapshot = guard.clone();
        drop(guard);
        self.persist(&snapshot).await;
    }

    async fn persist(&self, records: &HashMap<String, SessionRecord>) {
        if let Err(e) = persist_to(&self.path, records).await {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist session store");
        }
    }
}

async fn persist_to(
    path: &Path,
    records: &HashMap<String, SessionRecord>,
) -> Result<(), MemoryError> {
    let buf = serde_json::to_string_pretty(records)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let tmp = atomic_temp_path(path);
    tokio::fs::write(&tmp, buf).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakeClient {
        created: AtomicU32,
    }

    #[async_trait]
    impl StoreClient for FakeClient {
        async fn health(&self) -> Result<Value, MemoryError> {
            unimplemented!()
        }
        async fn create_session(&self) -> Result<String, MemoryError> {
            let n = self.created.fetch_add(1, Ordering::SeqCst);
            Ok(format!("store-sess-{n}"))
        }
        async fn list_sessions(&self) -> Result<Value, MemoryError> {
            unimplemented!()
        }
        async fn get_session(&self, _id: &str) -> Result<Value, MemoryError> {
            unimplemented!()
        }
        async fn delete_session(&self, _id: &str) -> Result<(), MemoryError> {
            unimplemented!()
        }
        async fn extract_session(&self, _id: &str) -> Result<Value, MemoryError> {
            unimplemented!()
        }
        async fn add_session_message(&self, _id: &str, _role: &str, _content: &str) -> Result<(), MemoryError> {
            unimplemented!()
        }
        async fn add_events_batch(&self, _id: &str, _events: &[Value]) -> Result<(), MemoryError> {
            unimplemented!()
        }
        async fn commit_session(&self, _id: &str, _cause: &str) -> Result<(), MemoryError> {
            unimplemented!()
        }
        async fn search(
            &self,
            _query: &str,
            _target_uri: &str,
            _session_id: Option<&str>,
            _limit: u32,
            _score_threshold: Option<f64>,
        ) -> Result<membridge_client::types::SearchResult, MemoryError> {
            unimplemented!()
        }
        async fn find(
            &self,
            _query: &str,
            _target_uri: &str,
            _session_id: Option<&str>,
            _limit: u32,
            _score_threshold: Option<f64>,
        ) -> Result<membridge_client::types::SearchResult, MemoryError> {
            unimplemented!()
        }
        async fn grep(&self, _uri: &str, _pattern: &str, _case_insensitive: bool) -> Result<Value, MemoryError> {
            unimplemented!()
        }
        async fn glob(&self, _pattern: &str, _uri: &str) -> Result<Value, MemoryError> {
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
            _path: &str,
            _target: Option<&str>,
            _reason: &str,
            _instruction: &str,
            _wait: bool,
            _timeout: Option<u64>,
        ) -> Result<Value, MemoryError> {
            unimplemented!()
        }
        async fn add_skill(&self, _data: &Value, _wait: bool, _timeout: Option<u64>) -> Result<Value, MemoryError> {
            unimplemented!()
        }
        async fn wait_processed(&self, _timeout: Option<u64>) -> Result<Value, MemoryError> {
            unimplemented!()
        }
        async fn fs_ls(&self, _uri: &str) -> Result<Value, MemoryError> {
            unimplemented!()
        }
        async fn fs_tree(&self, _uri: &str) -> Result<Value, MemoryError> {
            unimplemented!()
        }
        async fn fs_stat(&self, _uri: &str) -> Result<Value, MemoryError> {
            unimplemented!()
        }
        async fn fs_mkdir(&self, _uri: &str) -> Result<(), MemoryError> {
            unimplemented!()
        }
        async fn fs_rm(&self, _uri: &str, _recursive: bool) -> Result<(), MemoryError> {
            unimplemented!()
        }
        async fn fs_mv(&self, _from_uri: &str, _to_uri: &str) -> Result<(), MemoryError> {
            unimplemented!()
        }
        async fn relations(&self, _uri: &str) -> Result<Vec<membridge_client::types::RelationEdge>, MemoryError> {
            unimplemented!()
        }
        async fn link_relation(&self, _from_uri: &str, _to_uri: &str, _reason: Option<&str>) -> Result<(), MemoryError> {
            unimplemented!()
        }
        async fn unlink_relation(&self, _from_uri: &str, _to_uri: &str) -> Result<(), MemoryError> {
            unimplemented!()
        }
        async fn observer_queue(&self) -> Result<Value, MemoryError> {
            unimplemented!()
        }
        async fn observer_vikingdb(&self) -> Result<Value, MemoryError> {
            unimplemented!()
        }
        async fn observer_vlm(&self) -> Result<Value, MemoryError> {
            unimplemented!()
        }
        async fn observer_transaction(&self) -> Result<Value, MemoryError> {
            unimplemented!()
        }
        async fn observer_system(&self) -> Result<Value, MemoryError> {
            unimplemented!()
        }
        async fn pack_export(&self, _body: &Value) -> Result<Value, MemoryError> {
            unimplemented!()
        }
        async fn pack_import(&self, _body: &Value) -> Result<Value, MemoryError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn ensure_link_creates_once_and_memoizes() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionLinkRegistry::new(dir.path().join("sessions.json"));
        let client = FakeClient { created: AtomicU32::new(0) };
        let key = SessionKey::from_string("s1");

        let first = registry.ensure_link(&key, &client).await.unwrap();
        let second = registry.ensure_link(&key, &client).await.unwrap();

        assert_eq!(first.as_str(), second.as_str());
        assert_eq!(client.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bump_seq_and_mark_commit_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let registry = SessionLinkRegistry::new(&path);
        let key = SessionKey::from_string("s1");

        registry.bump_seq(&key, 3).await;
        registry.bump_seq(&key, 0).await; // max(1, 0) == 1
        registry.mark_commit_queued(&key).await;

        let fresh = SessionLinkRegistry::new(&path);
        fresh.load().await;
        let link = fresh.get(&key).await.unwrap();
        assert_eq!(link.last_synced_seq, 4);
        assert!(link.last_commit_at > 0);
    }

    #[tokio::test]
    async fn store_session_id_is_immutable_once_set() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionLinkRegistry::new(dir.path().join("sessions.json"));
        let client = FakeClient { created: AtomicU32::new(0) };
        let key = SessionKey::from_string("s1");

        let first = registry.ensure_link(&key, &client).await.unwrap();
        registry.bump_seq(&key, 5).await;
        let second = registry.ensure_link(&key, &client).await.unwrap();
        assert_eq!(first.as_str(), second.as_str());
    }
}

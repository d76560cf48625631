//! The session-store file's persisted wire shape.
//!
//! The host's session store is shared with other host subsystems; this
//! crate only owns three of its fields (`openvikingSessionId`,
//! `lastSyncedSeq`, `lastCommitAt`). `session_id`/`updated_at`/`session_file`
//! round-trip untouched so a shared file survives being read and rewritten
//! by this registry without losing host-owned data.

use serde::{Deserialize, Serialize};

use membridge_core::{SessionLink, StoreSessionId};

/// One entry in the session-store file, keyed by host sessionKey.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Host-owned session id, round-tripped untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Host-owned last-update timestamp, round-tripped untouched.
    #[serde(default)]
    pub updated_at: i64,
    /// Host-owned session transcript file path, round-tripped untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_file: Option<String>,
    /// This subsystem's linked store session id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openviking_session_id: Option<String>,
    /// This subsystem's monotonic queued-event counter.
    #[serde(default)]
    pub last_synced_seq: u64,
    /// This subsystem's last queued-commit timestamp.
    #[serde(default)]
    pub last_commit_at: i64,
}

impl SessionRecord {
    /// Project the memory-bridge-owned fields out as a [`SessionLink`].
    #[must_use]
    pub fn to_link(&self) -> SessionLink {
        SessionLink {
            store_session_id: self.openviking_session_id.clone().map(StoreSessionId::from),
            last_synced_seq: self.last_synced_seq,
            last_commit_at: self.last_commit_at,
        }
    }

    /// Merge a [`SessionLink`]'s fields back into this record, preserving
    /// host-owned fields untouched.
    pub fn apply_link(&mut self, link: &SessionLink) {
        self.openviking_session_id = link.store_session_id.as_ref().map(|id| id.as_str().to_owned());
        self.last_synced_seq = link.last_synced_seq;
        self.last_commit_at = link.last_commit_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_host_owned_fields() {
        let record = SessionRecord {
            session_id: Some("host-sess-1".into()),
            updated_at: 1000,
            session_file: Some("/tmp/session.jsonl".into()),
            openviking_session_id: None,
            last_synced_seq: 0,
            last_commit_at: 0,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["sessionId"], "host-sess-1");
        assert_eq!(json["sessionFile"], "/tmp/session.jsonl");
        let back: SessionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.session_id.as_deref(), Some("host-sess-1"));
    }

    #[test]
    fn to_link_and_apply_link_are_inverse_for_bridge_fields() {
        let mut record = SessionRecord::default();
        record.openviking_session_id = Some("store-1".into());
        record.last_synced_seq = 7;
        record.last_commit_at = 42;

        let link = record.to_link();
        assert_eq!(link.store_session_id.unwrap().as_str(), "store-1");

        let mut fresh = SessionRecord::default();
        fresh.apply_link(&record.to_link());
        assert_eq!(fresh.last_synced_seq, 7);
        assert_eq!(fresh.last_commit_at, 42);
    }
}

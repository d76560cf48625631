//! Shared data model: session links, session events, outbox items, and the
//! transient ranking candidate used by the read pipeline.
//!
//! These types have no I/O of their own — they are the vocabulary that
//! `membridge-sessions`, `membridge-outbox`, `membridge-bridge`, and
//! `membridge-read` all pass between each other.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{EventId, SessionKey, StoreSessionId};

/// Persistent mapping from a host `sessionKey` to store session metadata.
///
/// Created lazily on first write; never destroyed by this subsystem. Once
/// `store_session_id` is set it is immutable for that session key.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLink {
    /// Store-side session id, absent until the first write for this key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_session_id: Option<StoreSessionId>,
    /// Count of events successfully *queued* (not necessarily delivered).
    #[serde(default)]
    pub last_synced_seq: u64,
    /// Wall-clock millis of the last queued commit; zero if none.
    #[serde(default)]
    pub last_commit_at: i64,
}

impl SessionLink {
    /// Whether this link has a store session id assigned yet.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.store_session_id.is_some()
    }
}

/// Role carried by `message` events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventRole {
    /// Authored by the human user.
    User,
    /// Authored by the agent.
    Assistant,
}

/// A single event destined for the store, tagged by kind.
///
/// Modeled as a tagged record (`#[serde(tag = "event_type")]`) rather than
/// subclass polymorphism, per the write-bridge design.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A user or assistant message.
    Message {
        /// Unique id for this event, assigned at creation.
        event_id: EventId,
        /// Who authored the message.
        role: EventRole,
        /// Message text, already hygiene-trimmed/truncated.
        content: String,
        /// Optional string-keyed metadata.
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        metadata: HashMap<String, String>,
    },
    /// A tool invocation result, JSON-encoded.
    ToolResult {
        /// Unique id for this event, assigned at creation.
        event_id: EventId,
        /// JSON-encoded description of the tool call.
        content: serde_json::Value,
        /// Optional string-keyed metadata.
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        metadata: HashMap<String, String>,
    },
    /// A checkpoint marker that drives store-side indexing/extraction.
    Commit {
        /// Unique id for this event, assigned at creation.
        event_id: EventId,
        /// Why the commit was fired (`session_end`, `reset`, `periodic`, `manual`).
        cause: String,
        /// Optional string-keyed metadata.
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        metadata: HashMap<String, String>,
    },
}

impl SessionEvent {
    /// The event's own id, regardless of variant.
    #[must_use]
    pub fn event_id(&self) -> &EventId {
        match self {
            Self::Message { event_id, .. }
            | Self::ToolResult { event_id, .. }
            | Self::Commit { event_id, .. } => event_id,
        }
    }

    /// Whether this is a `commit` event.
    #[must_use]
    pub fn is_commit(&self) -> bool {
        matches!(self, Self::Commit { .. })
    }
}

/// A durable, ordered outbox record: one batch of events bound for a single
/// store session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxItem {
    /// Unique id for this item (UUID v7).
    pub id: crate::ids::OutboxItemId,
    /// Millis since epoch when this item was first enqueued.
    pub created_at: i64,
    /// Millis since epoch when this item was last touched (retry bump).
    pub updated_at: i64,
    /// Number of delivery attempts made so far.
    #[serde(default)]
    pub attempts: u32,
    /// Millis since epoch; the item is not attempted before this time.
    pub next_attempt_at: i64,
    /// Host session key this batch belongs to.
    pub session_key: SessionKey,
    /// Store session id at enqueue time (denormalized).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<StoreSessionId>,
    /// Ordered, non-empty list of events in this batch.
    pub events: Vec<SessionEvent>,
}

impl OutboxItem {
    /// Whether this item is eligible to be sent given the current time.
    #[must_use]
    pub fn is_ready(&self, now_ms: i64) -> bool {
        self.next_attempt_at <= now_ms
    }
}

/// Which bucket of store content a ranking candidate came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    /// Session memories (always searched).
    Memory,
    /// Ingested resources (files, docs).
    Resource,
    /// Ingested skills (playbooks, templates).
    Skill,
}

impl ContextKind {
    /// Infer a kind from a store uri's path prefix, used for relation seed
    /// anchors whose kind isn't otherwise known.
    #[must_use]
    pub fn infer_from_uri(uri: &str) -> Self {
        if uri.contains("/skills/") {
            Self::Skill
        } else if uri.contains("/session/") || uri.contains("/memories/") {
            Self::Memory
        } else {
            Self::Resource
        }
    }

    /// The wire/diagnostics string for this kind (`memory`/`resource`/`skill`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Resource => "resource",
            Self::Skill => "skill",
        }
    }
}

/// Where a ranking candidate originated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum CandidateOrigin {
    /// A direct hit from `search` or its `find` fallback.
    Direct,
    /// Discovered via relation-expansion BFS from an anchor.
    Relation {
        /// The anchor uri this candidate was expanded from.
        relation_from: String,
        /// BFS depth at which this candidate was discovered.
        relation_depth: u32,
        /// Optional store-provided reason for the link.
        #[serde(skip_serializing_if = "Option::is_none")]
        relation_reason: Option<String>,
    },
}

/// A store-returned record underlying a ranking candidate.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StoreContext {
    /// Store uri for this context.
    pub uri: String,
    /// Store-reported relevance score, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Short abstract / match-reason text (l0 layer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#abstract: Option<String>,
    /// Overview text (l1 layer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    /// Why this context matched the query, if the store supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_reason: Option<String>,
}

/// A transient, per-search ranking candidate.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingCandidate {
    /// Which bucket this candidate was pulled from.
    pub kind: ContextKind,
    /// The underlying store context.
    pub context: StoreContext,
    /// Relevance score (defaults to 0 when the store omits one).
    pub score: f64,
    /// Computed rank used for sorting; always `>= score - small bonuses`.
    pub rank: f64,
    /// Direct hit or relation-expanded.
    pub origin: CandidateOrigin,
}

impl RankingCandidate {
    /// The candidate's store uri, convenience accessor.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.context.uri
    }
}

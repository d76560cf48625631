//! Typed request/response shapes for the store's wire protocol.
//!
//! Operations whose shape matters to the read/write paths (search, find,
//! relations, content layers) get full structs; operator-surface and
//! passthrough operations (fs listing, observer health, pack export/import)
//! pass `serde_json::Value` straight through, since this subsystem never
//! inspects their internals.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `POST /api/v1/sessions` response.
#[derive(Debug, Deserialize)]
pub struct CreateSessionResult {
    /// The newly minted store session id.
    pub session_id: String,
}

/// `POST /api/v1/sessions/{id}/messages` request body.
#[derive(Debug, Serialize)]
pub struct AddMessageRequest<'a> {
    /// `user` or `assistant`.
    pub role: &'a str,
    /// Message text.
    pub content: &'a str,
}

/// `POST /api/v1/sessions/{id}/events/batch` request body.
#[derive(Debug, Serialize)]
pub struct AddEventsBatchRequest<'a> {
    /// The batch of wire-ready events.
    pub events: &'a [Value],
}

/// `POST /api/v1/sessions/{id}/commit` request body.
#[derive(Debug, Serialize)]
pub struct CommitSessionRequest<'a> {
    /// Why the commit fired.
    pub cause: &'a str,
}

/// `POST /api/v1/search/search` and `.../find` request body.
#[derive(Debug, Serialize)]
pub struct SearchRequest<'a> {
    /// The user's natural-language query.
    pub query: &'a str,
    /// Root uri to scope the search under.
    pub target_uri: &'a str,
    /// Linked store session id, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
    /// Maximum hits to return.
    pub limit: u32,
    /// Minimum relevance score to keep, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f64>,
    /// `find`-only keyword filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<&'a str>,
}

/// A single typed query the store's planner decided to run.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PlannedQuery {
    /// `memory` | `resource` | `skill`.
    #[serde(default)]
    pub context_type: Option<String>,
    /// Planner-assigned priority (1 highest).
    #[serde(default)]
    pub priority: Option<u32>,
    /// Directories the planner suggests seeding relation expansion from.
    #[serde(default)]
    pub target_directories: Vec<String>,
}

/// `query_plan` field of a search response.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct QueryPlan {
    /// The planned queries, highest priority first in typical store output.
    #[serde(default)]
    pub queries: Vec<PlannedQuery>,
}

/// A single `query_results[]` entry.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct QueryResultSignal {
    /// `memory` | `resource` | `skill`.
    #[serde(default)]
    pub context_type: Option<String>,
    /// Count of contexts this query type matched.
    #[serde(default)]
    pub matched_contexts: u32,
}

/// A single store context hit (memory, resource, or skill).
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ContextHit {
    /// Store uri.
    pub uri: String,
    /// Relevance score, if the store computed one.
    #[serde(default)]
    pub score: Option<f64>,
    /// Short abstract / match-reason text.
    #[serde(default)]
    pub r#abstract: Option<String>,
    /// Overview text.
    #[serde(default)]
    pub overview: Option<String>,
    /// Why this hit matched, if supplied.
    #[serde(default)]
    pub match_reason: Option<String>,
}

/// `search`/`find` response result payload.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SearchResult {
    /// Memory hits (always searched).
    #[serde(default)]
    pub memories: Vec<ContextHit>,
    /// Resource hits.
    #[serde(default)]
    pub resources: Vec<ContextHit>,
    /// Skill hits.
    #[serde(default)]
    pub skills: Vec<ContextHit>,
    /// The planner's decision inputs, if the store ran one.
    #[serde(default)]
    pub query_plan: Option<QueryPlan>,
    /// Per-query-type match signal counts.
    #[serde(default)]
    pub query_results: Vec<QueryResultSignal>,
}

/// A relation edge returned by `GET /api/v1/relations`.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationEdge {
    /// The neighboring uri.
    pub uri: String,
    /// Why the store links these two uris, if it says.
    #[serde(default)]
    pub reason: Option<String>,
}

/// `POST /api/v1/resources` request body.
#[derive(Debug, Serialize)]
pub struct AddResourceRequest<'a> {
    /// Source path or uri to ingest.
    pub path: &'a str,
    /// Optional destination override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<&'a str>,
    /// Why this resource is being added.
    pub reason: &'a str,
    /// Ingestion instruction for the store's pipeline.
    pub instruction: &'a str,
    /// Whether to block until processing completes.
    pub wait: bool,
    /// Optional wait timeout, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// `POST /api/v1/skills` request body.
#[derive(Debug, Serialize)]
pub struct AddSkillRequest<'a> {
    /// Skill payload, store-defined shape.
    pub data: &'a Value,
    /// Whether to block until processing completes.
    pub wait: bool,
    /// Optional wait timeout, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// `POST /api/v1/fs/mkdir` request body.
#[derive(Debug, Serialize)]
pub struct FsMkdirRequest<'a> {
    /// Already policy-vetted, normalized uri.
    pub uri: &'a str,
}

/// `POST /api/v1/fs/mv` request body.
#[derive(Debug, Serialize)]
pub struct FsMvRequest<'a> {
    /// Policy-vetted source uri.
    pub from_uri: &'a str,
    /// Policy-vetted destination uri.
    pub to_uri: &'a str,
}

/// `POST/DELETE /api/v1/relations/link` request body.
#[derive(Debug, Serialize)]
pub struct RelationLinkRequest<'a> {
    /// Source uri.
    pub from_uri: &'a str,
    /// Target uri.
    pub to_uri: &'a str,
    /// Optional human-readable reason for the link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'a str>,
}

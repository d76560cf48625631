//! The resolved memory-bridge configuration surface.
//!
//! Every field has a documented default; zero or negative values on
//! numeric fields fall back to that default during resolution (see
//! [`crate::loader`]), so a partially-specified override file can never
//! accidentally disable budgets by supplying `0`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Commit delivery mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Block on `commitSession` and observe its result directly.
    #[default]
    Sync,
    /// Enqueue a `commit` event through the normal write path.
    Async,
}

/// Which context-type the retrieval planner should prioritize.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Derive priority from planner signals and query lexicon.
    #[default]
    Auto,
    /// Always prioritize memories.
    MemoryFirst,
    /// Always prioritize resources.
    ResourceFirst,
    /// Always prioritize skills.
    SkillFirst,
}

/// Content fidelity tier requested for snippet assembly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadLayer {
    /// Abstract / match-reason only.
    L0,
    /// Overview text.
    L1,
    /// Full read.
    L2,
    /// Pick whichever layer best fits the snippet budget.
    #[default]
    Progressive,
}

/// Commit trigger thresholds.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitTriggers {
    /// Allow an explicit `session_end` commit.
    #[serde(default = "default_true")]
    pub session_end: bool,
    /// Allow an explicit `reset` commit.
    #[serde(default = "default_true")]
    pub reset: bool,
    /// Fire a periodic commit every N non-commit enqueues (0 disables).
    #[serde(default = "default_every_n_messages")]
    pub every_n_messages: u32,
    /// Fire a periodic commit every N minutes since the last commit (0 disables).
    #[serde(default = "default_every_n_minutes")]
    pub every_n_minutes: u32,
}

impl Default for CommitTriggers {
    fn default() -> Self {
        Self {
            session_end: true,
            reset: true,
            every_n_messages: default_every_n_messages(),
            every_n_minutes: default_every_n_minutes(),
        }
    }
}

/// Commit configuration: mode plus trigger thresholds.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitConfig {
    /// Sync or async commit delivery.
    #[serde(default)]
    pub mode: CommitMode,
    /// Thresholds that fire a periodic commit automatically.
    #[serde(default)]
    pub triggers: CommitTriggers,
}

/// Outbox durability configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxConfig {
    /// Whether writes go through the durable outbox at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Path to the outbox file (one JSON record per line).
    #[serde(default = "default_outbox_path")]
    pub path: String,
    /// Periodic flush interval, in milliseconds.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Maximum successful sends per flush cycle.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: u32,
    /// Base delay for exponential backoff, in milliseconds.
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    /// Maximum backoff delay, in milliseconds.
    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_outbox_path(),
            flush_interval_ms: default_flush_interval_ms(),
            max_batch_size: default_max_batch_size(),
            retry_base_ms: default_retry_base_ms(),
            retry_max_ms: default_retry_max_ms(),
        }
    }
}

/// Priority-boost knobs applied to relation expansion budgets when the
/// planner's decided priority isn't `memory`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationPriorityBoost {
    /// Whether the boost applies at all.
    #[serde(default = "default_true")]
    pub budget_boost: bool,
    /// Extra BFS depth granted when boosted.
    #[serde(default = "default_depth_bonus")]
    pub depth_bonus: u32,
    /// Extra anchor slots granted when boosted.
    #[serde(default = "default_anchors_bonus")]
    pub anchors_bonus: u32,
    /// Extra expanded-entry budget granted when boosted.
    #[serde(default = "default_expanded_bonus")]
    pub expanded_bonus: u32,
}

impl Default for RelationPriorityBoost {
    fn default() -> Self {
        Self {
            budget_boost: true,
            depth_bonus: default_depth_bonus(),
            anchors_bonus: default_anchors_bonus(),
            expanded_bonus: default_expanded_bonus(),
        }
    }
}

/// Search / retrieval configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    /// Maximum store search hits considered.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Minimum relevance score to keep a candidate, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f64>,
    /// Root uri the search is scoped under.
    #[serde(default = "default_target_uri")]
    pub target_uri: String,
    /// Whether resources are ever eligible for inclusion.
    #[serde(default = "default_true")]
    pub include_resources: bool,
    /// Whether skills are ever eligible for inclusion.
    #[serde(default = "default_true")]
    pub include_skills: bool,
    /// Fixed or auto-derived priority strategy.
    #[serde(default)]
    pub strategy: SearchStrategy,
    /// Requested content fidelity tier.
    #[serde(default)]
    pub read_layer: ReadLayer,
    /// Maximum emitted result rows.
    #[serde(default = "default_max_entries")]
    pub max_entries: u32,
    /// Maximum characters per emitted snippet.
    #[serde(default = "default_max_snippet_chars")]
    pub max_snippet_chars: u32,
    /// Maximum total injected characters across all emitted snippets.
    #[serde(default = "default_max_injected_chars")]
    pub max_injected_chars: u32,
    /// Whether relation-graph BFS expansion is enabled.
    #[serde(default)]
    pub relation_expansion: bool,
    /// Base BFS depth for relation expansion.
    #[serde(default = "default_relation_max_depth")]
    pub relation_max_depth: u32,
    /// Base anchor cap for relation expansion.
    #[serde(default = "default_relation_max_anchors")]
    pub relation_max_anchors: u32,
    /// Base cap on distinct discovered relation uris.
    #[serde(default = "default_relation_max_expanded_entries")]
    pub relation_max_expanded_entries: u32,
    /// Score assigned to planner-seeded anchors.
    #[serde(default = "default_relation_seed_anchor_score")]
    pub relation_seed_anchor_score: f64,
    /// Priority-based budget boost knobs.
    #[serde(default)]
    pub relation_priority_boost: RelationPriorityBoost,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            score_threshold: None,
            target_uri: default_target_uri(),
            include_resources: true,
            include_skills: true,
            strategy: SearchStrategy::default(),
            read_layer: ReadLayer::default(),
            max_entries: default_max_entries(),
            max_snippet_chars: default_max_snippet_chars(),
            max_injected_chars: default_max_injected_chars(),
            relation_expansion: false,
            relation_max_depth: default_relation_max_depth(),
            relation_max_anchors: default_relation_max_anchors(),
            relation_max_expanded_entries: default_relation_max_expanded_entries(),
            relation_seed_anchor_score: default_relation_seed_anchor_score(),
            relation_priority_boost: RelationPriorityBoost::default(),
        }
    }
}

/// Destructive filesystem-operation policy configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsWriteConfig {
    /// Master switch; all mutations are denied when false.
    #[serde(default)]
    pub enabled: bool,
    /// Uri prefixes that mutations are allowed under.
    #[serde(default)]
    pub allow_uri_prefixes: Vec<String>,
    /// Uri prefixes that are always denied, even under an allow prefix.
    #[serde(default)]
    pub deny_uri_prefixes: Vec<String>,
    /// Exact uris that can never be mutated.
    #[serde(default)]
    pub protected_uris: Vec<String>,
    /// Whether `rm --recursive` is permitted at all.
    #[serde(default)]
    pub allow_recursive_rm: bool,
}

/// The fully resolved memory-bridge configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryConfig {
    /// Master switch for the whole subsystem. When `false`, the bridge and
    /// read pipeline short-circuit to their "not queued" / empty results.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether host events are mirrored to the store at all. Independent of
    /// `enabled` so a deployment can keep read access while pausing writes.
    #[serde(default = "default_true")]
    pub dual_write: bool,
    /// Store base url, e.g. `http://localhost:8700`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Per-request timeout, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Optional API key, sent as `X-API-Key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Static headers merged into every request (caller-supplied headers
    /// at call time override these).
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Commit mode and trigger thresholds.
    #[serde(default)]
    pub commit: CommitConfig,
    /// Durable outbox settings.
    #[serde(default)]
    pub outbox: OutboxConfig,
    /// Retrieval / search settings.
    #[serde(default)]
    pub search: SearchConfig,
    /// Destructive fs-operation policy settings.
    #[serde(default)]
    pub fs_write: FsWriteConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dual_write: true,
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
            api_key: None,
            headers: HashMap::new(),
            commit: CommitConfig::default(),
            outbox: OutboxConfig::default(),
            search: SearchConfig::default(),
            fs_write: FsWriteConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_endpoint() -> String {
    "http://localhost:8700".to_owned()
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_outbox_path() -> String {
    "~/.memory-bridge/outbox.jsonl".to_owned()
}
fn default_flush_interval_ms() -> u64 {
    2_000
}
fn default_max_batch_size() -> u32 {
    50
}
fn default_retry_base_ms() -> u64 {
    1_000
}
fn default_retry_max_ms() -> u64 {
    60_000
}
fn default_every_n_messages() -> u32 {
    24
}
fn default_every_n_minutes() -> u32 {
    12
}
fn default_target_uri() -> String {
    "viking://".to_owned()
}
fn default_limit() -> u32 {
    10
}
fn default_max_entries() -> u32 {
    6
}
fn default_max_snippet_chars() -> u32 {
    560
}
fn default_max_injected_chars() -> u32 {
    3_200
}
fn default_relation_max_depth() -> u32 {
    2
}
fn default_relation_max_anchors() -> u32 {
    4
}
fn default_relation_max_expanded_entries() -> u32 {
    12
}
fn default_relation_seed_anchor_score() -> f64 {
    0.35
}
fn default_depth_bonus() -> u32 {
    1
}
fn default_anchors_bonus() -> u32 {
    2
}
fn default_expanded_bonus() -> u32 {
    6
}

//! Per-(agentId, endpoint) diagnostics snapshots, refreshed on every search.
//!
//! Single-writer, last-writer-wins under concurrent searches — matching the
//! subsystem's own concurrency note that read-pipeline diagnostics need no
//! stronger guarantee than that.

use membridge_config::ReadLayer;
use membridge_planner::PlannerDecision;
use serde::Serialize;

/// Explains *why* a search returned what it did: the signals the planner
/// saw and whether a `find` fallback fired.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainabilitySnapshot {
    /// The (trimmed) query text this snapshot describes.
    pub query: String,
    /// `query_results` signals, formatted `"{context_type}:{matched_contexts}"`.
    pub typed_queries: Vec<String>,
    /// Final emitted row count.
    pub result_count: usize,
    /// First five `query_plan.queries` entries, formatted `"{context_type}@p{priority}"`.
    pub top_planner_queries: Vec<String>,
    /// `"find"` if phase D's fallback fired, else absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_kind: Option<String>,
    /// Hit count of the fallback call, if it fired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_hits: Option<usize>,
}

/// Per-layer emitted counts, tallied during snippet assembly.
#[derive(Clone, Copy, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerCounts {
    /// Rows emitted at the abstract layer.
    pub l0: usize,
    /// Rows emitted at the overview layer.
    pub l1: usize,
    /// Rows emitted at the full-read layer.
    pub l2: usize,
}

impl LayerCounts {
    /// Tally one emitted row at `layer`.
    pub fn record(&mut self, layer: ReadLayer) {
        match layer {
            ReadLayer::L0 => self.l0 += 1,
            ReadLayer::L1 => self.l1 += 1,
            ReadLayer::L2 | ReadLayer::Progressive => self.l2 += 1,
        }
    }
}

/// Phase H's budget accounting.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayeringSnapshot {
    /// The configured `readLayer` this search requested.
    pub requested_layer: ReadLayer,
    /// Rows emitted.
    pub entries: usize,
    /// Sum of emitted snippet lengths, in characters.
    pub snippet_chars: usize,
    /// `maxInjectedChars` minus the remaining budget at the end of assembly.
    pub injected_chars: usize,
    /// Per-layer emitted counts.
    pub layer_counts: LayerCounts,
    /// Whether `remainingChars` hit zero before all selected candidates were emitted.
    pub truncated_by_budget: bool,
}

/// Phase F's relation-expansion accounting.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationExpansionSnapshot {
    /// Whether relation expansion ran at all.
    pub enabled: bool,
    /// Whether the priority budget boost applied.
    pub boost_applied: bool,
    /// Effective max BFS depth after boost.
    pub max_depth: u32,
    /// Effective max anchor count after boost.
    pub max_anchors: u32,
    /// Effective max distinct discovered uris after boost.
    pub max_expanded_entries: u32,
    /// Anchors selected (direct-candidate anchors plus seed anchors).
    pub anchors: usize,
    /// Of `anchors`, how many came from the planner's `target_directories`.
    pub seed_anchors: usize,
    /// Total `C1.relations` calls made.
    pub relation_queries: u32,
    /// Distinct relation-origin uris discovered.
    pub discovered_uris: usize,
    /// Relation-origin candidates produced (after best-rank-per-uri dedup).
    pub candidates_produced: usize,
}

/// Phase G/H's candidate funnel, from raw hits to emitted rows.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingSnapshot {
    /// Direct plus relation candidates before any filtering.
    pub total_candidates: usize,
    /// Candidates from phase E (direct search hits).
    pub direct_candidates: usize,
    /// Candidates from phase F (relation expansion).
    pub relation_candidates: usize,
    /// Candidates remaining after the `minScore` filter.
    pub filtered_candidates: usize,
    /// Candidates remaining after the `hardLimit` truncation.
    pub selected_candidates: usize,
    /// Rows actually emitted after snippet assembly.
    pub emitted_candidates: usize,
    /// Selected candidates dropped by the `hardLimit` truncation.
    pub dropped_by_max_entries: usize,
    /// Selected candidates dropped once `remainingChars` was exhausted.
    pub dropped_by_budget: usize,
    /// Candidates whose resolved snippet was empty.
    pub skipped_empty_snippet: usize,
}

/// The complete per-search diagnostics bundle.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    /// Phase A/B/D explainability.
    pub explainability: Option<ExplainabilitySnapshot>,
    /// Phase B's planner decision.
    pub strategy: Option<PlannerDecision>,
    /// Phase H's budget accounting.
    pub layering: Option<LayeringSnapshot>,
    /// Phase F's relation-expansion accounting.
    pub relation_expansion: Option<RelationExpansionSnapshot>,
    /// Phase G/H's candidate funnel.
    pub ranking: Option<RankingSnapshot>,
}

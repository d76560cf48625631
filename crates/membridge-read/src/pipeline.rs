//! The Read Pipeline (C6): one `search()` call drives phases A through H.

use std::sync::Arc;

use membridge_client::types::{ContextHit, QueryPlan, SearchResult};
use membridge_client::StoreClient;
use membridge_config::MemoryConfig;
use membridge_core::{ContextKind, MemoryError, RankingCandidate};
use membridge_planner::decide;
use membridge_sessions::SessionLinkRegistry;
use tokio::sync::Mutex as AsyncMutex;

use crate::diagnostics::{DiagnosticsSnapshot, ExplainabilitySnapshot, RankingSnapshot};
use crate::layering;
use crate::ranking::build_direct_candidates;
use crate::readfile::read_file;
use crate::relations::expand_relations;
use crate::types::{ReadFileResult, ReadOptions, ReadResultRow};

/// Gather `(kind, hit)` pairs from a search result, honoring the planner's
/// include-resources/include-skills decision. Memories are always gathered.
fn gather_contexts(result: &SearchResult, include_resources: bool, include_skills: bool) -> Vec<(ContextKind, ContextHit)> {
    let mut gathered: Vec<(ContextKind, ContextHit)> = result
        .memories
        .iter()
        .cloned()
        .map(|hit| (ContextKind::Memory, hit))
        .collect();
    if include_resources {
        gathered.extend(result.resources.iter().cloned().map(|hit| (ContextKind::Resource, hit)));
    }
    if include_skills {
        gathered.extend(result.skills.iter().cloned().map(|hit| (ContextKind::Skill, hit)));
    }
    gathered
}

fn top_planner_queries(plan: Option<&QueryPlan>) -> Vec<String> {
    plan.map(|p| {
        p.queries
            .iter()
            .take(5)
            .map(|q| {
                format!(
                    "{}@p{}",
                    q.context_type.as_deref().unwrap_or("unknown"),
                    q.priority.unwrap_or(0)
                )
            })
            .collect()
    })
    .unwrap_or_default()
}

/// Drives one complete retrieval: search, plan, gather, (fallback), rank,
/// (relation-expand), filter/sort, and layered snippet assembly.
///
/// Holds its own `(client, sessions, config)` trio so it can be memoized
/// per `(agentId, endpoint)` by [`crate::registry::ReadPipelineRegistry`];
/// diagnostics are single-writer, last-writer-wins, matching the read
/// pipeline's own concurrency note.
pub struct ReadPipeline {
    client: Arc<dyn StoreClient>,
    sessions: Arc<SessionLinkRegistry>,
    config: MemoryConfig,
    diagnostics: AsyncMutex<DiagnosticsSnapshot>,
}

impl ReadPipeline {
    /// Construct a pipeline over an already-built client and session
    /// registry, bound to one resolved config snapshot.
    #[must_use]
    pub fn new(config: MemoryConfig, client: Arc<dyn StoreClient>, sessions: Arc<SessionLinkRegistry>) -> Self {
        Self {
            client,
            sessions,
            config,
            diagnostics: AsyncMutex::new(DiagnosticsSnapshot::default()),
        }
    }

    /// The most recent search's diagnostics snapshot.
    pub async fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.lock().await.clone()
    }

    /// Read one uri directly, bypassing search/ranking (§4.6's read-file path).
    pub async fn read_file(&self, rel_path: &str, from: Option<u32>, lines: Option<u32>) -> Result<ReadFileResult, MemoryError> {
        read_file(self.client.as_ref(), rel_path, from, lines).await
    }

    /// Probe the store's VLM/embedding pipeline health. A `MemoryBackend`
    /// implementation surfaces this as a plain bool; this crate preserves
    /// the underlying `Result` so callers can log the failure.
    pub async fn observer_vlm(&self) -> Result<serde_json::Value, MemoryError> {
        self.client.observer_vlm().await
    }

    /// Probe the store's vector index health. See [`ReadPipeline::observer_vlm`].
    pub async fn observer_vikingdb(&self) -> Result<serde_json::Value, MemoryError> {
        self.client.observer_vikingdb().await
    }

    /// Execute a full search: phases A through H.
    pub async fn search(&self, query: &str, options: ReadOptions) -> Result<Vec<ReadResultRow>, MemoryError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let search_cfg = &self.config.search;
        let limit = options.max_results.unwrap_or(search_cfg.limit).min(search_cfg.limit).max(1);
        let score_threshold = options.min_score.or(search_cfg.score_threshold);

        let store_session_id = match &options.session_key {
            Some(key) => self
                .sessions
                .get(key)
                .await
                .and_then(|link| link.store_session_id)
                .map(|id| id.as_str().to_owned()),
            None => None,
        };

        // Phase A: primary search.
        let search_result = self
            .client
            .search(trimmed, &search_cfg.target_uri, store_session_id.as_deref(), limit, score_threshold)
            .await?;

        // Phase B: planning.
        let decision = decide(
            search_cfg,
            trimmed,
            options.session_key.is_some(),
            search_result.query_plan.as_ref(),
            &search_result.query_results,
        );

        // Phase C: context gathering.
        let mut gathered = gather_contexts(&search_result, decision.include_resources, decision.include_skills);

        // Phase D: `find` fallback.
        let mut fallback_kind = None;
        let mut fallback_hits = None;
        if gathered.is_empty() {
            let fallback_result = self
                .client
                .find(trimmed, &search_cfg.target_uri, store_session_id.as_deref(), limit, score_threshold)
                .await?;
            gathered = gather_contexts(&fallback_result, decision.include_resources, decision.include_skills);
            fallback_kind = Some("find".to_owned());
            fallback_hits = Some(gathered.len());
        }

        // Phase E: direct ranking.
        let direct_candidates = build_direct_candidates(gathered, decision.priority);

        // Phase F: relation expansion (optional).
        let boost_applied = search_cfg.relation_priority_boost.budget_boost && decision.priority != ContextKind::Memory;
        let relation_outcome = expand_relations(
            self.client.as_ref(),
            &direct_candidates,
            search_result.query_plan.as_ref(),
            &decision,
            search_cfg.relation_expansion,
            search_cfg.relation_max_depth,
            search_cfg.relation_max_anchors,
            search_cfg.relation_max_expanded_entries,
            search_cfg.relation_seed_anchor_score,
            boost_applied,
            search_cfg.relation_priority_boost.depth_bonus,
            search_cfg.relation_priority_boost.anchors_bonus,
            search_cfg.relation_priority_boost.expanded_bonus,
        )
        .await;

        let direct_count = direct_candidates.len();
        let relation_count = relation_outcome.candidates.len();

        // Phase G: filter & sort.
        let mut combined: Vec<RankingCandidate> = direct_candidates;
        combined.extend(relation_outcome.candidates);
        let total_candidates = combined.len();

        if let Some(min_score) = options.min_score {
            combined.retain(|c| c.score >= min_score);
        }
        let filtered_candidates = combined.len();

        combined.sort_by(|a, b| {
            b.rank
                .partial_cmp(&a.rank)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
        });

        let hard_limit = limit.min(search_cfg.max_entries).max(1) as usize;
        let selected_candidates = combined.len().min(hard_limit);
        let dropped_by_max_entries = combined.len().saturating_sub(hard_limit);
        combined.truncate(hard_limit);

        // Phase H: layered snippet assembly.
        let (rows, layering_snapshot, skipped_empty_snippet, dropped_by_budget) = layering::assemble_rows(
            self.client.as_ref(),
            &combined,
            search_cfg.read_layer,
            search_cfg.max_snippet_chars,
            search_cfg.max_injected_chars,
            search_cfg.relation_expansion,
        )
        .await;

        let typed_queries: Vec<String> = search_result
            .query_results
            .iter()
            .map(|r| format!("{}:{}", r.context_type.as_deref().unwrap_or("unknown"), r.matched_contexts))
            .collect();

        let snapshot = DiagnosticsSnapshot {
            explainability: Some(ExplainabilitySnapshot {
                query: trimmed.to_owned(),
                typed_queries,
                result_count: rows.len(),
                top_planner_queries: top_planner_queries(search_result.query_plan.as_ref()),
                fallback_kind,
                fallback_hits,
            }),
            strategy: Some(decision),
            layering: Some(layering_snapshot),
            relation_expansion: Some(relation_outcome.snapshot),
            ranking: Some(RankingSnapshot {
                total_candidates,
                direct_candidates: direct_count,
                relation_candidates: relation_count,
                filtered_candidates,
                selected_candidates,
                emitted_candidates: rows.len(),
                dropped_by_max_entries,
                dropped_by_budget,
                skipped_empty_snippet,
            }),
        };
        *self.diagnostics.lock().await = snapshot;

        Ok(rows)
    }
}

//! The Retrieval Planner (C5): a pure function from configured strategy,
//! query text, session presence, and optional store-returned planner
//! signals to a context-type priority decision.

use membridge_client::types::{PlannedQuery, QueryPlan, QueryResultSignal};
use membridge_config::SearchStrategy;
use membridge_core::ContextKind;
use serde::Serialize;

use crate::lexicon::{self, RESOURCE_SIGNALS, SKILL_SIGNALS};

/// The planner's output for one search: which context type to prioritize,
/// and whether resources/skills should be consulted at all.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerDecision {
    /// The strategy that produced this decision (configured, not inferred).
    pub strategy: SearchStrategy,
    /// Human-readable provenance, e.g. `auto-planner-plan-session`.
    pub reason: String,
    /// Which context type should be prioritized in ranking bonuses.
    pub priority: ContextKind,
    /// Whether resource contexts should be gathered at all.
    pub include_resources: bool,
    /// Whether skill contexts should be gathered at all.
    pub include_skills: bool,
}

/// Weight assigned to a planner-declared priority (1 is highest).
fn plan_priority_weight(priority: Option<u32>) -> i32 {
    match priority {
        Some(1) => 5,
        Some(2) => 4,
        Some(3) => 3,
        Some(4) => 2,
        _ => 1,
    }
}

/// Weight assigned to a query-result match count, clamped to `[1, 5]`.
fn results_weight(matched_contexts: u32) -> i32 {
    matched_contexts.clamp(1, 5) as i32
}

fn parse_context_type(s: &str) -> Option<ContextKind> {
    match s {
        "memory" => Some(ContextKind::Memory),
        "resource" => Some(ContextKind::Resource),
        "skill" => Some(ContextKind::Skill),
        _ => None,
    }
}

/// Sum weights per context type; returns `Some(kind)` only if exactly one
/// kind holds the strict maximum (no ties, nothing present counts as no
/// winner).
fn dominant_kind(weights: &[(ContextKind, i32)]) -> Option<ContextKind> {
    let mut totals: Vec<(ContextKind, i32)> = Vec::new();
    for (kind, weight) in weights {
        if let Some(entry) = totals.iter_mut().find(|(k, _)| k == kind) {
            entry.1 += weight;
        } else {
            totals.push((*kind, *weight));
        }
    }
    if totals.is_empty() {
        return None;
    }
    let max = totals.iter().map(|(_, w)| *w).max().unwrap();
    let winners: Vec<ContextKind> = totals.iter().filter(|(_, w)| *w == max).map(|(k, _)| *k).collect();
    if winners.len() == 1 {
        Some(winners[0])
    } else {
        None
    }
}

fn plan_weights(plan: &QueryPlan) -> Vec<(ContextKind, i32)> {
    plan.queries
        .iter()
        .filter_map(|q: &PlannedQuery| {
            let kind = parse_context_type(q.context_type.as_deref()?)?;
            Some((kind, plan_priority_weight(q.priority)))
        })
        .collect()
}

fn result_weights(results: &[QueryResultSignal]) -> Vec<(ContextKind, i32)> {
    results
        .iter()
        .filter_map(|r| {
            let kind = parse_context_type(r.context_type.as_deref()?)?;
            Some((kind, results_weight(r.matched_contexts)))
        })
        .collect()
}

fn suffix(has_session: bool) -> &'static str {
    if has_session {
        "-session"
    } else {
        ""
    }
}

fn promotion(kind: ContextKind, include_resources: bool, include_skills: bool) -> (bool, bool) {
    match kind {
        ContextKind::Resource => (true, include_skills),
        ContextKind::Skill => (include_resources, true),
        ContextKind::Memory => (include_resources, include_skills),
    }
}

/// Decide the context-type priority for one search.
#[must_use]
pub fn decide(
    config: &membridge_config::SearchConfig,
    query: &str,
    has_session: bool,
    query_plan: Option<&QueryPlan>,
    query_results: &[QueryResultSignal],
) -> PlannerDecision {
    match config.strategy {
        SearchStrategy::MemoryFirst => {
            let (r, s) = promotion(ContextKind::Memory, config.include_resources, config.include_skills);
            return PlannerDecision {
                strategy: config.strategy,
                reason: "configured-memory-first".to_owned(),
                priority: ContextKind::Memory,
                include_resources: r,
                include_skills: s,
            };
        }
        SearchStrategy::ResourceFirst => {
            let (r, s) = promotion(ContextKind::Resource, config.include_resources, config.include_skills);
            return PlannerDecision {
                strategy: config.strategy,
                reason: "configured-resource-first".to_owned(),
                priority: ContextKind::Resource,
                include_resources: r,
                include_skills: s,
            };
        }
        SearchStrategy::SkillFirst => {
            let (r, s) = promotion(ContextKind::Skill, config.include_resources, config.include_skills);
            return PlannerDecision {
                strategy: config.strategy,
                reason: "configured-skill-first".to_owned(),
                priority: ContextKind::Skill,
                include_resources: r,
                include_skills: s,
            };
        }
        SearchStrategy::Auto => {}
    }

    if let Some(plan) = query_plan {
        let weights = plan_weights(plan);
        if let Some(kind) = dominant_kind(&weights) {
            let (r, s) = promotion(kind, config.include_resources, config.include_skills);
            return PlannerDecision {
                strategy: config.strategy,
                reason: format!("auto-planner-plan{}", suffix(has_session)),
                priority: kind,
                include_resources: r,
                include_skills: s,
            };
        }
    }

    let result_w = result_weights(query_results);
    if let Some(kind) = dominant_kind(&result_w) {
        let (r, s) = promotion(kind, config.include_resources, config.include_skills);
        return PlannerDecision {
            strategy: config.strategy,
            reason: format!("auto-planner-results{}", suffix(has_session)),
            priority: kind,
            include_resources: r,
            include_skills: s,
        };
    }

    if let Some(plan) = query_plan {
        let mut combined = plan_weights(plan);
        combined.extend(result_weights(query_results));
        if let Some(kind) = dominant_kind(&combined) {
            let (r, s) = promotion(kind, config.include_resources, config.include_skills);
            return PlannerDecision {
                strategy: config.strategy,
                reason: format!("auto-planner-combined{}", suffix(has_session)),
                priority: kind,
                include_resources: r,
                include_skills: s,
            };
        }
    }

    // Lexical heuristic fallback.
    let tokens = lexicon::tokenize(query);
    let resource_hits = lexicon::count_signal_hits(&tokens, RESOURCE_SIGNALS);
    let skill_hits = lexicon::count_signal_hits(&tokens, SKILL_SIGNALS);

    let priority = match resource_hits.cmp(&skill_hits) {
        std::cmp::Ordering::Greater => ContextKind::Resource,
        std::cmp::Ordering::Less => ContextKind::Skill,
        std::cmp::Ordering::Equal if resource_hits > 0 => ContextKind::Resource,
        std::cmp::Ordering::Equal => ContextKind::Memory,
    };

    PlannerDecision {
        strategy: config.strategy,
        reason: format!("auto-lexical{}", suffix(has_session)),
        priority,
        include_resources: config.include_resources || resource_hits > 0,
        include_skills: config.include_skills || skill_hits > 0,
    }
}

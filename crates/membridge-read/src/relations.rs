//! Phase F: optional bounded relation-graph BFS expansion from anchors.

use std::collections::{HashMap, HashSet, VecDeque};

use membridge_client::types::QueryPlan;
use membridge_client::StoreClient;
use membridge_core::{CandidateOrigin, ContextKind, RankingCandidate, StoreContext};
use membridge_planner::PlannerDecision;

use crate::diagnostics::RelationExpansionSnapshot;
use crate::ranking::priority_bonus;

struct Anchor {
    uri: String,
    score: f64,
}

/// Outcome of phase F: relation-origin candidates plus their diagnostics.
pub struct RelationExpansionOutcome {
    /// Relation-origin candidates, deduplicated to the best rank per uri.
    pub candidates: Vec<RankingCandidate>,
    /// Accounting for `DiagnosticsSnapshot.relation_expansion`.
    pub snapshot: RelationExpansionSnapshot,
}

/// Select anchors from the top-ranked direct candidates, then (if room
/// remains) append seed anchors from the planner's `target_directories`.
fn select_anchors(
    direct_candidates: &[RankingCandidate],
    query_plan: Option<&QueryPlan>,
    seed_score: f64,
    max_anchors: u32,
) -> (Vec<Anchor>, usize) {
    let mut sorted: Vec<&RankingCandidate> = direct_candidates.iter().collect();
    sorted.sort_by(|a, b| {
        b.rank
            .partial_cmp(&a.rank)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut seen: HashSet<String> = HashSet::new();
    let mut anchors = Vec::new();
    for candidate in sorted {
        if anchors.len() >= max_anchors as usize {
            break;
        }
        if seen.insert(candidate.uri().to_owned()) {
            anchors.push(Anchor {
                uri: candidate.uri().to_owned(),
                score: candidate.score,
            });
        }
    }

    let mut seed_anchors = 0usize;
    if anchors.len() < max_anchors as usize {
        if let Some(plan) = query_plan {
            'dirs: for query in &plan.queries {
                for dir in &query.target_directories {
                    if anchors.len() >= max_anchors as usize {
                        break 'dirs;
                    }
                    if seen.insert(dir.clone()) {
                        anchors.push(Anchor {
                            uri: dir.clone(),
                            score: seed_score,
                        });
                        seed_anchors += 1;
                    }
                }
            }
        }
    }

    (anchors, seed_anchors)
}

/// Run phase F. Returns an empty, `enabled: false` outcome when relation
/// expansion is off in config.
pub async fn expand_relations(
    client: &dyn StoreClient,
    direct_candidates: &[RankingCandidate],
    query_plan: Option<&QueryPlan>,
    decision: &PlannerDecision,
    enabled: bool,
    base_max_depth: u32,
    base_max_anchors: u32,
    base_max_expanded_entries: u32,
    seed_score: f64,
    boost_applied: bool,
    depth_bonus: u32,
    anchors_bonus: u32,
    expanded_bonus: u32,
) -> RelationExpansionOutcome {
    if !enabled {
        return RelationExpansionOutcome {
            candidates: Vec::new(),
            snapshot: RelationExpansionSnapshot {
                enabled: false,
                ..RelationExpansionSnapshot::default()
            },
        };
    }

    let max_depth = base_max_depth + if boost_applied { depth_bonus } else { 0 };
    let max_anchors = base_max_anchors + if boost_applied { anchors_bonus } else { 0 };
    let max_expanded_entries =
        base_max_expanded_entries + if boost_applied { expanded_bonus } else { 0 };

    let (anchors, seed_anchors) = select_anchors(direct_candidates, query_plan, seed_score, max_anchors);

    let direct_uris: HashSet<&str> = direct_candidates.iter().map(RankingCandidate::uri).collect();
    let query_budget = max_anchors.max(max_expanded_entries.saturating_mul(max_depth)) as usize;

    let mut relation_queries: u32 = 0;
    let mut discovered: HashMap<String, RankingCandidate> = HashMap::new();

    'anchors: for anchor in &anchors {
        let mut queue: VecDeque<(String, u32)> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();
        queue.push_back((anchor.uri.clone(), 0));
        visited.insert(anchor.uri.clone());

        while let Some((uri, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            if relation_queries as usize >= query_budget {
                break 'anchors;
            }
            relation_queries += 1;
            let Ok(edges) = client.relations(&uri).await else {
                continue;
            };

            for edge in edges {
                if direct_uris.contains(edge.uri.as_str()) {
                    continue;
                }
                let new_depth = depth + 1;
                if !discovered.contains_key(&edge.uri) && discovered.len() >= max_expanded_entries as usize {
                    continue;
                }

                let kind = ContextKind::infer_from_uri(&edge.uri);
                let relation_score =
                    (anchor.score - f64::from(new_depth) * 0.12 - 0.08).max(0.0);
                let relation_rank = relation_score + priority_bonus(kind, decision.priority)
                    - 0.25
                    - f64::from(new_depth) * 0.05;

                let candidate = RankingCandidate {
                    kind,
                    context: StoreContext {
                        uri: edge.uri.clone(),
                        score: Some(relation_score),
                        r#abstract: None,
                        overview: None,
                        match_reason: edge.reason.clone(),
                    },
                    score: relation_score,
                    rank: relation_rank,
                    origin: CandidateOrigin::Relation {
                        relation_from: anchor.uri.clone(),
                        relation_depth: new_depth,
                        relation_reason: edge.reason.clone(),
                    },
                };

                let better = discovered
                    .get(&edge.uri)
                    .is_none_or(|existing| candidate.rank > existing.rank);
                if better {
                    discovered.insert(edge.uri.clone(), candidate);
                }

                if visited.insert(edge.uri.clone()) && new_depth < max_depth {
                    queue.push_back((edge.uri.clone(), new_depth));
                }
            }
        }
    }

    let snapshot = RelationExpansionSnapshot {
        enabled: true,
        boost_applied,
        max_depth,
        max_anchors,
        max_expanded_entries,
        anchors: anchors.len(),
        seed_anchors,
        relation_queries,
        discovered_uris: discovered.len(),
        candidates_produced: discovered.len(),
    };

    RelationExpansionOutcome {
        candidates: discovered.into_values().collect(),
        snapshot,
    }
}

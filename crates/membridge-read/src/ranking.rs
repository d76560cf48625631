//! Phase E: direct ranking of store search hits into [`RankingCandidate`]s.

use membridge_client::types::ContextHit;
use membridge_core::{CandidateOrigin, ContextKind, RankingCandidate, StoreContext};

/// The rank bonus applied on top of a candidate's raw score: `+0.15` when
/// `kind` matches the planner's decided `priority`, `+0.05` for memory
/// candidates otherwise, `0` in every other case.
#[must_use]
pub fn priority_bonus(kind: ContextKind, priority: ContextKind) -> f64 {
    if kind == priority {
        0.15
    } else if kind == ContextKind::Memory {
        0.05
    } else {
        0.0
    }
}

fn hit_to_context(hit: ContextHit) -> StoreContext {
    StoreContext {
        uri: hit.uri,
        score: hit.score,
        r#abstract: hit.r#abstract,
        overview: hit.overview,
        match_reason: hit.match_reason,
    }
}

/// Build phase E's direct-origin candidates from gathered `(kind, hit)`
/// pairs, ranking each by its raw score plus [`priority_bonus`].
#[must_use]
pub fn build_direct_candidates(
    hits: Vec<(ContextKind, ContextHit)>,
    priority: ContextKind,
) -> Vec<RankingCandidate> {
    hits.into_iter()
        .map(|(kind, hit)| {
            let score = hit.score.unwrap_or(0.0);
            let rank = score + priority_bonus(kind, priority);
            RankingCandidate {
                kind,
                context: hit_to_context(hit),
                score,
                rank,
                origin: CandidateOrigin::Direct,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(uri: &str, score: f64) -> ContextHit {
        ContextHit {
            uri: uri.to_owned(),
            score: Some(score),
            r#abstract: None,
            overview: None,
            match_reason: None,
        }
    }

    #[test]
    fn matching_kind_gets_full_bonus() {
        assert_eq!(priority_bonus(ContextKind::Skill, ContextKind::Skill), 0.15);
    }

    #[test]
    fn memory_gets_small_bonus_when_not_priority() {
        assert_eq!(priority_bonus(ContextKind::Memory, ContextKind::Skill), 0.05);
    }

    #[test]
    fn non_memory_non_priority_gets_no_bonus() {
        assert_eq!(priority_bonus(ContextKind::Resource, ContextKind::Skill), 0.0);
    }

    #[test]
    fn direct_candidates_rank_includes_bonus() {
        let hits = vec![(ContextKind::Skill, hit("viking://a", 0.5))];
        let candidates = build_direct_candidates(hits, ContextKind::Skill);
        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].rank - 0.65).abs() < 1e-9);
        assert_eq!(candidates[0].origin, CandidateOrigin::Direct);
    }

    #[test]
    fn missing_score_defaults_to_zero() {
        let hits = vec![(
            ContextKind::Memory,
            ContextHit {
                uri: "viking://b".to_owned(),
                score: None,
                r#abstract: None,
                overview: None,
                match_reason: None,
            },
        )];
        let candidates = build_direct_candidates(hits, ContextKind::Resource);
        assert_eq!(candidates[0].score, 0.0);
    }
}

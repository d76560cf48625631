//! Phase H: layered snippet assembly under a total character budget.

use membridge_client::StoreClient;
use membridge_config::ReadLayer;
use membridge_core::{trim_with_ellipsis, CandidateOrigin, RankingCandidate};

use crate::diagnostics::LayeringSnapshot;
use crate::types::ReadResultRow;

async fn fetch_abstract(client: &dyn StoreClient, candidate: &RankingCandidate) -> Option<String> {
    if let Some(text) = candidate.context.r#abstract.as_deref() {
        if !text.trim().is_empty() {
            return Some(text.to_owned());
        }
    }
    if let Some(reason) = candidate.context.match_reason.as_deref() {
        if !reason.trim().is_empty() {
            return Some(reason.to_owned());
        }
    }
    match client.r#abstract(candidate.uri()).await {
        Ok(text) if !text.trim().is_empty() => Some(text),
        _ => None,
    }
}

async fn fetch_overview(client: &dyn StoreClient, candidate: &RankingCandidate) -> Option<String> {
    if let Some(text) = candidate.context.overview.as_deref() {
        if !text.trim().is_empty() {
            return Some(text.to_owned());
        }
    }
    match client.overview(candidate.uri()).await {
        Ok(text) if !text.trim().is_empty() => Some(text),
        _ => None,
    }
}

async fn fetch_read(client: &dyn StoreClient, candidate: &RankingCandidate) -> Option<String> {
    match client.read(candidate.uri()).await {
        Ok(text) if !text.trim().is_empty() => Some(text),
        _ => None,
    }
}

/// Resolve one candidate's snippet text and the layer it was actually
/// resolved at, following the fallback chain for `requested_layer`.
///
/// Every fallback here is fail-silent: a failed `read`/`overview`/`abstract`
/// call degrades to the next layer in the chain rather than propagating an
/// error, per the pipeline's snippet-load posture. Inline fields already
/// present on the candidate are always preferred over an extra store call.
async fn resolve_snippet(
    client: &dyn StoreClient,
    candidate: &RankingCandidate,
    requested_layer: ReadLayer,
    max_snippet_chars: u32,
) -> (String, ReadLayer) {
    match requested_layer {
        ReadLayer::L2 => {
            if let Some(text) = fetch_read(client, candidate).await {
                return (text, ReadLayer::L2);
            }
            if let Some(text) = fetch_overview(client, candidate).await {
                return (text, ReadLayer::L1);
            }
            if let Some(text) = fetch_abstract(client, candidate).await {
                return (text, ReadLayer::L0);
            }
            (String::new(), ReadLayer::L0)
        }
        ReadLayer::L1 => {
            if let Some(text) = fetch_overview(client, candidate).await {
                return (text, ReadLayer::L1);
            }
            if let Some(text) = fetch_abstract(client, candidate).await {
                return (text, ReadLayer::L0);
            }
            if let Some(text) = fetch_read(client, candidate).await {
                return (text, ReadLayer::L2);
            }
            (String::new(), ReadLayer::L0)
        }
        ReadLayer::L0 => {
            if let Some(text) = fetch_abstract(client, candidate).await {
                return (text, ReadLayer::L0);
            }
            if let Some(text) = fetch_overview(client, candidate).await {
                return (text, ReadLayer::L1);
            }
            if let Some(text) = fetch_read(client, candidate).await {
                return (text, ReadLayer::L2);
            }
            (String::new(), ReadLayer::L0)
        }
        ReadLayer::Progressive => {
            let threshold = (max_snippet_chars / 6).max(40) as usize;

            let overview = fetch_overview(client, candidate).await;
            if let Some(text) = &overview {
                if text.chars().count() >= threshold {
                    return (text.clone(), ReadLayer::L1);
                }
            }
            let abstract_text = fetch_abstract(client, candidate).await;
            if let Some(text) = &abstract_text {
                if text.chars().count() >= threshold {
                    return (text.clone(), ReadLayer::L0);
                }
            }
            if let Some(text) = fetch_read(client, candidate).await {
                return (text, ReadLayer::L2);
            }
            match (overview, abstract_text) {
                (Some(o), Some(a)) if o.chars().count() >= a.chars().count() => (o, ReadLayer::L1),
                (Some(_), Some(a)) => (a, ReadLayer::L0),
                (Some(o), None) => (o, ReadLayer::L1),
                (None, Some(a)) => (a, ReadLayer::L0),
                (None, None) => (String::new(), ReadLayer::L0),
            }
        }
    }
}

fn origin_prefix(origin: &CandidateOrigin) -> String {
    match origin {
        CandidateOrigin::Direct => "[direct-hit] ".to_owned(),
        CandidateOrigin::Relation {
            relation_from,
            relation_depth,
            ..
        } => format!("[relation-expanded d{relation_depth} from {relation_from}] "),
    }
}

/// Assemble emitted rows from `candidates`, already sorted best-first and
/// truncated to the hard entry limit, spending from a shared
/// `max_injected_chars` budget until it runs out.
///
/// Returns the emitted rows, the layering snapshot, the count of candidates
/// skipped for an empty resolved snippet, and the count dropped once the
/// injected-character budget ran out.
pub async fn assemble_rows(
    client: &dyn StoreClient,
    candidates: &[RankingCandidate],
    requested_layer: ReadLayer,
    max_snippet_chars: u32,
    max_injected_chars: u32,
    relation_expansion_enabled: bool,
) -> (Vec<ReadResultRow>, LayeringSnapshot, usize, usize) {
    let mut snapshot = LayeringSnapshot {
        requested_layer,
        ..LayeringSnapshot::default()
    };
    let mut rows = Vec::new();
    let mut remaining_chars = max_injected_chars as usize;
    let mut skipped_empty = 0usize;
    let mut dropped_by_budget = 0usize;

    for (idx, candidate) in candidates.iter().enumerate() {
        let (raw, layer) = resolve_snippet(client, candidate, requested_layer, max_snippet_chars).await;

        let mut text = trim_with_ellipsis(&raw, max_snippet_chars as usize);
        if relation_expansion_enabled {
            let tagged = format!("{}{}", origin_prefix(&candidate.origin), text);
            text = trim_with_ellipsis(&tagged, max_snippet_chars as usize);
        }

        if text.trim().is_empty() {
            skipped_empty += 1;
            continue;
        }

        if remaining_chars == 0 {
            snapshot.truncated_by_budget = true;
            dropped_by_budget += candidates.len() - idx;
            break;
        }

        let char_count = text.chars().count();
        let final_text = if char_count > remaining_chars {
            let trimmed = trim_with_ellipsis(&text, remaining_chars);
            if trimmed.trim().is_empty() {
                snapshot.truncated_by_budget = true;
                dropped_by_budget += candidates.len() - idx;
                break;
            }
            trimmed
        } else {
            text
        };

        let emitted_len = final_text.chars().count();
        remaining_chars = remaining_chars.saturating_sub(emitted_len);
        snapshot.layer_counts.record(layer);
        snapshot.snippet_chars += emitted_len;
        rows.push(ReadResultRow {
            path: candidate.uri().to_owned(),
            start_line: 1,
            end_line: 1,
            score: candidate.score,
            snippet: final_text,
            source: candidate.kind.as_str().to_owned(),
        });
    }

    snapshot.entries = rows.len();
    snapshot.injected_chars = (max_injected_chars as usize).saturating_sub(remaining_chars);
    (rows, snapshot, skipped_empty, dropped_by_budget)
}

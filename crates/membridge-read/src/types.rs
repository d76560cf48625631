//! Public request/response shapes for a read-pipeline search.

use membridge_core::SessionKey;

/// Per-call overrides for a [`crate::pipeline::ReadPipeline::search`] call.
#[derive(Clone, Debug, Default)]
pub struct ReadOptions {
    /// Caps the emitted result count; combined with the configured search
    /// limit via `min`.
    pub max_results: Option<u32>,
    /// Drops any candidate whose `score` falls below this value.
    pub min_score: Option<f64>,
    /// Host session this search is scoped to, if any.
    pub session_key: Option<SessionKey>,
}

/// One emitted row: a store uri plus the snippet selected for injection.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadResultRow {
    /// Store uri this row was resolved from.
    pub path: String,
    /// Always `1`; the store has no line-addressable search results.
    pub start_line: u32,
    /// Always `1`; see `start_line`.
    pub end_line: u32,
    /// The candidate's relevance score (not its rank).
    pub score: f64,
    /// The assembled, budget-trimmed snippet text.
    pub snippet: String,
    /// Which context bucket this row came from (`memory`/`resource`/`skill`).
    pub source: String,
}

/// The outcome of a direct `readFile` call.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadFileResult {
    /// The (possibly line-sliced) file content.
    pub text: String,
    /// The normalized `viking://` uri actually read.
    pub path: String,
}

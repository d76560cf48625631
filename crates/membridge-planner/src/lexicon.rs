//! Fixed lexical-heuristic signal sets, consulted only once planner signals
//! and query-result signals have failed to produce a clear winner.

/// Words that suggest the query is really about a resource (file, doc, …).
pub const RESOURCE_SIGNALS: &[&str] = &[
    "file", "path", "readme", "markdown", "resource", "code", "config",
    "api", "document", "docs", "documentation", "script", "module",
    "library", "repo", "repository", "source", "directory", "folder",
];

/// Words that suggest the query is really about a skill (how-to, playbook, …).
pub const SKILL_SIGNALS: &[&str] = &[
    "how", "plan", "steps", "workflow", "playbook", "guide", "template",
    "skill", "strategy", "process", "procedure", "tutorial",
    "instructions", "checklist", "methodology",
];

/// Tokenise on non-alphanumeric boundaries and lowercase each token.
#[must_use]
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Count tokens present in `signals`.
#[must_use]
pub fn count_signal_hits(tokens: &[String], signals: &[&str]) -> u32 {
    tokens.iter().filter(|t| signals.contains(&t.as_str())).count() as u32
}

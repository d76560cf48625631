//! Config loading: defaults → file deep-merge → environment overrides →
//! zero/negative normalization.
//!
//! Mirrors the host's own settings loader: start from
//! [`MemoryConfig::default()`], deep-merge a JSON override file if present
//! (objects merge recursively, arrays/scalars are replaced wholesale, `null`
//! in the override is skipped), then apply a fixed table of env var
//! overrides. An env var that fails to parse is silently ignored.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::types::MemoryConfig;

/// Default config-file path: `~/.memory-bridge/config.json`, overridable via
/// `MEMORY_BRIDGE_CONFIG_PATH`.
#[must_use]
pub fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("MEMORY_BRIDGE_CONFIG_PATH") {
        if !p.is_empty() {
            return PathBuf::from(p);
        }
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_owned());
    PathBuf::from(home).join(".memory-bridge").join("config.json")
}

/// Load config from the default path, applying env overrides.
pub fn load_config() -> Result<MemoryConfig, serde_json::Error> {
    load_config_from_path(&config_path())
}

/// Load config from a specific path, applying env overrides.
///
/// If the file does not exist, returns defaults plus env overrides. If the
/// file contains invalid JSON, returns an error.
pub fn load_config_from_path(path: &Path) -> Result<MemoryConfig, serde_json::Error> {
    let defaults = serde_json::to_value(MemoryConfig::default())?;

    let merged = if path.exists() {
        tracing::debug!(?path, "loading memory-bridge config from file");
        let content = std::fs::read_to_string(path).unwrap_or_default();
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        tracing::debug!(?path, "memory-bridge config file not found, using defaults");
        defaults
    };

    let mut config: MemoryConfig = serde_json::from_value(merged)?;
    apply_env_overrides(&mut config);
    normalize_defaults(&mut config);
    Ok(config)
}

/// Recursive deep merge of two JSON values.
///
/// Objects are merged recursively (source overrides target per-key);
/// arrays/primitives are replaced wholesale by source; `null` in source is
/// skipped (preserves target).
#[must_use]
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Replace any zero/negative numeric field with its documented default.
///
/// JSON has no unsigned-only guarantee once passed through an override
/// file, so this catches both `0` (meaningless for a budget) and any field
/// that `serde` happened to coerce down.
pub fn normalize_defaults(config: &mut MemoryConfig) {
    let defaults = MemoryConfig::default();

    if config.timeout_ms == 0 {
        config.timeout_ms = defaults.timeout_ms;
    }
    if config.outbox.flush_interval_ms == 0 {
        config.outbox.flush_interval_ms = defaults.outbox.flush_interval_ms;
    }
    if config.outbox.max_batch_size == 0 {
        config.outbox.max_batch_size = defaults.outbox.max_batch_size;
    }
    if config.outbox.retry_base_ms == 0 {
        config.outbox.retry_base_ms = defaults.outbox.retry_base_ms;
    }
    if config.outbox.retry_max_ms == 0 {
        config.outbox.retry_max_ms = defaults.outbox.retry_max_ms;
    }
    if config.search.limit == 0 {
        config.search.limit = defaults.search.limit;
    }
    if config.search.max_entries == 0 {
        config.search.max_entries = defaults.search.max_entries;
    }
    if config.search.max_snippet_chars == 0 {
        config.search.max_snippet_chars = defaults.search.max_snippet_chars;
    }
    if config.search.max_injected_chars == 0 {
        config.search.max_injected_chars = defaults.search.max_injected_chars;
    }
    if config.search.relation_max_depth == 0 {
        config.search.relation_max_depth = defaults.search.relation_max_depth;
    }
    if config.search.relation_max_anchors == 0 {
        config.search.relation_max_anchors = defaults.search.relation_max_anchors;
    }
    if config.search.relation_max_expanded_entries == 0 {
        config.search.relation_max_expanded_entries =
            defaults.search.relation_max_expanded_entries;
    }
}

/// Apply a fixed table of environment-variable overrides.
///
/// Each variable has strict, range-checked parsing; a variable that fails
/// to parse is silently ignored, never a hard error.
pub fn apply_env_overrides(config: &mut MemoryConfig) {
    if let Some(v) = read_env_bool("MEMORY_BRIDGE_ENABLED") {
        config.enabled = v;
    }
    if let Some(v) = read_env_bool("MEMORY_BRIDGE_DUAL_WRITE") {
        config.dual_write = v;
    }
    if let Some(v) = read_env_string("MEMORY_BRIDGE_ENDPOINT") {
        config.endpoint = v;
    }
    if let Some(v) = read_env_u64("MEMORY_BRIDGE_TIMEOUT_MS", 1, 600_000) {
        config.timeout_ms = v;
    }
    if let Some(v) = read_env_string("MEMORY_BRIDGE_OUTBOX_PATH") {
        config.outbox.path = v;
    }
    if let Some(v) = read_env_bool("MEMORY_BRIDGE_OUTBOX_ENABLED") {
        config.outbox.enabled = v;
    }
    if let Some(v) = read_env_string("MEMORY_BRIDGE_API_KEY") {
        config.api_key = Some(v);
    }
    if let Some(v) = read_env_u32("MEMORY_BRIDGE_EVERY_N_MESSAGES", 0, 100_000) {
        config.commit.triggers.every_n_messages = v;
    }
    if let Some(v) = read_env_u32("MEMORY_BRIDGE_EVERY_N_MINUTES", 0, 100_000) {
        config.commit.triggers.every_n_minutes = v;
    }
    if let Some(v) = read_env_bool("MEMORY_BRIDGE_RELATION_EXPANSION") {
        config.search.relation_expansion = v;
    }
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u32 env var, ignoring");
    }
    result
}

/// Parse a string as a boolean; accepts (case-insensitive)
/// `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
#[must_use]
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
#[must_use]
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u32` within an inclusive range.
#[must_use]
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"search": {"limit": 10, "maxEntries": 6}});
        let source = serde_json::json!({"search": {"limit": 20}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["search"]["limit"], 20);
        assert_eq!(merged["search"]["maxEntries"], 6);
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"endpoint": "http://a"});
        let source = serde_json::json!({"endpoint": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["endpoint"], "http://a");
    }

    #[test]
    fn merge_array_replace_not_merge() {
        let target = serde_json::json!({"fsWrite": {"protectedUris": ["a"]}});
        let source = serde_json::json!({"fsWrite": {"protectedUris": ["b", "c"]}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["fsWrite"]["protectedUris"], serde_json::json!(["b", "c"]));
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let path = Path::new("/nonexistent/memory-bridge-config.json");
        let cfg = load_config_from_path(path).unwrap();
        assert_eq!(cfg.endpoint, MemoryConfig::default().endpoint);
    }

    #[test]
    fn load_partial_json_overrides_and_keeps_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"search": {"limit": 25}}"#).unwrap();
        let cfg = load_config_from_path(&path).unwrap();
        assert_eq!(cfg.search.limit, 25);
        assert_eq!(cfg.search.max_entries, 6);
    }

    #[test]
    fn load_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_config_from_path(&path).is_err());
    }

    #[test]
    fn zero_values_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"search": {"limit": 0, "maxEntries": 0}}"#).unwrap();
        let cfg = load_config_from_path(&path).unwrap();
        assert_eq!(cfg.search.limit, MemoryConfig::default().search.limit);
        assert_eq!(
            cfg.search.max_entries,
            MemoryConfig::default().search.max_entries
        );
    }

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_u64_range_bounds() {
        assert_eq!(parse_u64_range("500", 1, 1000), Some(500));
        assert_eq!(parse_u64_range("0", 1, 1000), None);
        assert_eq!(parse_u64_range("abc", 1, 1000), None);
    }
}

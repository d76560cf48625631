//! The FS Write Policy Gate (C7): every mutating fs operation (`mkdir`,
//! `rm`, `mv`) is vetted here before the store client is ever invoked.

use membridge_config::FsWriteConfig;
use membridge_core::MemoryError;

const VIKING_SCHEME: &str = "viking://";

fn policy_denied(rule: &str) -> MemoryError {
    MemoryError::Policy(format!("fs write denied: {rule}"))
}

/// Strip a single trailing `/` from non-root uris (`viking://x/` -> `viking://x`,
/// `viking://` stays `viking://`).
fn normalize_uri(uri: &str) -> String {
    if uri == VIKING_SCHEME {
        return uri.to_owned();
    }
    uri.strip_suffix('/').unwrap_or(uri).to_owned()
}

/// Whether `prefix` is a path-boundary-respecting prefix of `uri`: exact
/// match, `uri` starts with `prefix + "/"`, or `prefix` is the bare scheme.
fn prefix_matches(prefix: &str, uri: &str) -> bool {
    if prefix == VIKING_SCHEME {
        return true;
    }
    uri == prefix || uri.starts_with(&format!("{prefix}/"))
}

fn vet_one(config: &FsWriteConfig, uri: &str) -> Result<String, MemoryError> {
    if !uri.starts_with(VIKING_SCHEME) {
        return Err(policy_denied(&format!(
            "uri must start with {VIKING_SCHEME}, got {uri}"
        )));
    }
    let normalized = normalize_uri(uri);

    if config.allow_uri_prefixes.is_empty() {
        return Err(policy_denied("no allowUriPrefixes configured"));
    }

    if config.protected_uris.iter().any(|p| p == &normalized) {
        return Err(policy_denied(&format!("{normalized} is a protected uri")));
    }

    if let Some(deny) = config
        .deny_uri_prefixes
        .iter()
        .find(|p| prefix_matches(p, &normalized))
    {
        return Err(policy_denied(&format!(
            "{normalized} matches deny prefix {deny}"
        )));
    }

    if !config
        .allow_uri_prefixes
        .iter()
        .any(|p| prefix_matches(p, &normalized))
    {
        return Err(policy_denied(&format!(
            "{normalized} does not match any allowUriPrefixes entry"
        )));
    }

    Ok(normalized)
}

fn require_enabled(config: &FsWriteConfig) -> Result<(), MemoryError> {
    if !config.enabled {
        return Err(policy_denied("fs write is disabled"));
    }
    Ok(())
}

/// Vet a `mkdir` target. Returns the normalized uri to send to the store.
pub fn vet_mkdir(config: &FsWriteConfig, uri: &str) -> Result<String, MemoryError> {
    require_enabled(config)?;
    vet_one(config, uri)
}

/// Vet an `rm` target. `recursive` gates on `allowRecursiveRm`.
pub fn vet_rm(config: &FsWriteConfig, uri: &str, recursive: bool) -> Result<String, MemoryError> {
    require_enabled(config)?;
    if recursive && !config.allow_recursive_rm {
        return Err(policy_denied("recursive rm is not allowed"));
    }
    vet_one(config, uri)
}

/// Vet an `mv` operation. Both uris are vetted independently and must
/// normalize to distinct targets.
pub fn vet_mv(
    config: &FsWriteConfig,
    from_uri: &str,
    to_uri: &str,
) -> Result<(String, String), MemoryError> {
    require_enabled(config)?;
    let from = vet_one(config, from_uri)?;
    let to = vet_one(config, to_uri)?;
    if from == to {
        return Err(policy_denied("source and destination uri are the same"));
    }
    Ok((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_config() -> FsWriteConfig {
        FsWriteConfig {
            enabled: true,
            allow_uri_prefixes: vec!["viking://resources/docs".to_owned()],
            deny_uri_prefixes: vec![],
            protected_uris: vec!["viking://resources/docs/protected".to_owned()],
            allow_recursive_rm: false,
        }
    }

    #[test]
    fn disabled_gate_denies_everything() {
        let config = FsWriteConfig::default();
        assert!(vet_mkdir(&config, "viking://resources/docs/new").is_err());
    }

    #[test]
    fn mkdir_under_allowed_prefix_succeeds() {
        let config = enabled_config();
        let result = vet_mkdir(&config, "viking://resources/docs/new").unwrap();
        assert_eq!(result, "viking://resources/docs/new");
    }

    #[test]
    fn mv_into_protected_uri_fails() {
        let config = enabled_config();
        let err = vet_mv(
            &config,
            "viking://resources/docs/a",
            "viking://resources/docs/protected",
        )
        .unwrap_err();
        assert!(err.to_string().contains("protected uri"));
    }

    #[test]
    fn recursive_rm_without_allow_flag_fails_before_other_checks() {
        let config = enabled_config();
        let err = vet_rm(&config, "viking://resources/docs/old", true).unwrap_err();
        assert!(err.to_string().contains("recursive"));
    }

    #[test]
    fn recursive_rm_with_allow_flag_succeeds() {
        let mut config = enabled_config();
        config.allow_recursive_rm = true;
        let result = vet_rm(&config, "viking://resources/docs/old", true).unwrap();
        assert_eq!(result, "viking://resources/docs/old");
    }

    #[test]
    fn deny_prefix_wins_over_allow_prefix() {
        let mut config = enabled_config();
        config
            .deny_uri_prefixes
            .push("viking://resources/docs/locked".to_owned());
        let err = vet_mkdir(&config, "viking://resources/docs/locked/sub").unwrap_err();
        assert!(err.to_string().contains("deny prefix"));
    }

    #[test]
    fn uri_not_starting_with_scheme_is_rejected() {
        let config = enabled_config();
        let err = vet_mkdir(&config, "/abs/resources/docs/new").unwrap_err();
        assert!(err.to_string().contains("viking://"));
    }

    #[test]
    fn mv_with_identical_normalized_uris_fails() {
        let config = enabled_config();
        let err = vet_mv(
            &config,
            "viking://resources/docs/a/",
            "viking://resources/docs/a",
        )
        .unwrap_err();
        assert!(err.to_string().contains("same"));
    }

    #[test]
    fn trailing_slash_is_stripped_before_matching() {
        let config = enabled_config();
        let result = vet_mkdir(&config, "viking://resources/docs/new/").unwrap();
        assert_eq!(result, "viking://resources/docs/new");
    }
}

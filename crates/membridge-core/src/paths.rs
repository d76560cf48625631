//! Home-relative path expansion, shared by every crate that persists a
//! file under the user's home directory (`~/.memory-bridge/...`).

use std::path::{Path, PathBuf};

/// Expand a leading `~` (or `~/`) to `$HOME`, falling back to `/tmp` if
/// `HOME` is unset.
#[must_use]
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        return home_dir().join(rest);
    }
    if path == "~" {
        return home_dir();
    }
    PathBuf::from(path)
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_owned()))
}

/// The sibling temp path used for an atomic rewrite of `path`.
#[must_use]
pub fn atomic_temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

//! Direct `readFile` path for host requests that want one specific uri
//! rather than a ranked search.

use membridge_client::StoreClient;
use membridge_core::MemoryError;

use crate::types::ReadFileResult;

const RESOURCE_ROOT: &str = "viking://resource/";
const SCHEME: &str = "viking://";

/// Normalise `rel_path` to a `viking://`-prefixed uri: already-prefixed
/// inputs pass through unchanged; anything else (absolute or relative) is
/// rooted under `viking://resource/`.
#[must_use]
pub fn normalize_uri(rel_path: &str) -> String {
    if rel_path.starts_with(SCHEME) {
        return rel_path.to_owned();
    }
    let trimmed = rel_path.trim_start_matches('/');
    format!("{RESOURCE_ROOT}{trimmed}")
}

/// Slice `text` to the 1-indexed line range `[from, from + lines)`. Returns
/// the full text unchanged when `from`/`lines` aren't both supplied.
#[must_use]
pub fn slice_lines(text: &str, from: Option<u32>, lines: Option<u32>) -> String {
    let (Some(from), Some(lines)) = (from, lines) else {
        return text.to_owned();
    };
    if from == 0 || lines == 0 {
        return String::new();
    }
    let start = (from - 1) as usize;
    let end = start + lines as usize;
    text.lines().skip(start).take(end - start).collect::<Vec<_>>().join("\n")
}

/// Read one uri directly, bypassing search/ranking entirely.
pub async fn read_file(
    client: &dyn StoreClient,
    rel_path: &str,
    from: Option<u32>,
    lines: Option<u32>,
) -> Result<ReadFileResult, MemoryError> {
    let uri = normalize_uri(rel_path);
    let text = client.read(&uri).await?;
    let text = slice_lines(&text, from, lines);
    Ok(ReadFileResult { text, path: uri })
}

//! Content-length hygiene shared by the write bridge and the read pipeline.

/// Literal suffix appended when message content is truncated.
pub const TRUNCATION_MARKER: &str = "\n\n[truncated]";

/// Maximum message content length, in UTF-8 characters, before truncation.
pub const MAX_MESSAGE_CONTENT_CHARS: usize = 16_000;

/// Trim `content` and, if it exceeds [`MAX_MESSAGE_CONTENT_CHARS`], cut it to
/// fit and append [`TRUNCATION_MARKER`]. Truncation is not an error; it is a
/// silent, stable content transform.
#[must_use]
pub fn hygienic_message_content(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= MAX_MESSAGE_CONTENT_CHARS {
        return trimmed.to_owned();
    }
    let cut: String = trimmed
        .chars()
        .take(MAX_MESSAGE_CONTENT_CHARS)
        .collect();
    format!("{cut}{TRUNCATION_MARKER}")
}

/// Trim `text` to at most `max_chars` characters, appending a `...` ellipsis
/// when at least 4 characters are available for it (matching the read
/// pipeline's snippet-budget behavior).
#[must_use]
pub fn trim_with_ellipsis(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        return text.to_owned();
    }
    if max_chars < 4 {
        return text.chars().take(max_chars).collect();
    }
    let cut: String = text.chars().take(max_chars - 3).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_is_unchanged_but_trimmed() {
        assert_eq!(hygienic_message_content("  hello  "), "hello");
    }

    #[test]
    fn long_content_is_truncated_with_marker() {
        let long = "a".repeat(MAX_MESSAGE_CONTENT_CHARS + 500);
        let result = hygienic_message_content(&long);
        assert!(result.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            result.chars().count(),
            MAX_MESSAGE_CONTENT_CHARS + TRUNCATION_MARKER.chars().count()
        );
    }

    #[test]
    fn exact_boundary_is_not_truncated() {
        let exact = "b".repeat(MAX_MESSAGE_CONTENT_CHARS);
        assert_eq!(hygienic_message_content(&exact), exact);
    }

    #[test]
    fn trim_with_ellipsis_under_budget_unchanged() {
        assert_eq!(trim_with_ellipsis("short", 50), "short");
    }

    #[test]
    fn trim_with_ellipsis_over_budget_gets_ellipsis() {
        let result = trim_with_ellipsis(&"x".repeat(100), 10);
        assert_eq!(result.chars().count(), 10);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn trim_with_ellipsis_tiny_budget_no_ellipsis() {
        let result = trim_with_ellipsis(&"x".repeat(100), 2);
        assert_eq!(result, "xx");
    }
}

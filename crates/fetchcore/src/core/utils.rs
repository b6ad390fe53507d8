//! Small text helpers: URL extraction, captions, truncation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::config;

/// First http(s) URL in a message, up to the next whitespace.
pub static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    // Static pattern, verified by tests.
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?i)https?://\S+").unwrap()
});

/// Extracts the first URL from free-form message text.
pub fn extract_url(text: &str) -> Option<&str> {
    URL_REGEX.find(text.trim()).map(|m| m.as_str())
}

/// Returns the last `max_chars` characters of `text`, never splitting a character.
pub fn truncate_tail_utf8(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    let skip = total - max_chars;
    match text.char_indices().nth(skip) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// Builds a media caption from the description, falling back to the title.
///
/// Longer texts are cut to exactly `max_chars` characters, the last one being `…`.
pub fn build_caption(title: &str, description: &str, max_chars: usize) -> String {
    let description = description.trim();
    let text = if description.is_empty() { title.trim() } else { description };

    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }

    let mut caption: String = text.chars().take(max_chars - 1).collect();
    caption.push(config::caption::ELLIPSIS);
    caption
}

/// Bytes to megabytes for user-facing messages.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_url_finds_first_link() {
        assert_eq!(
            extract_url("look https://youtu.be/abc?t=1 and http://x.y"),
            Some("https://youtu.be/abc?t=1")
        );
        assert_eq!(extract_url("HTTPS://EXAMPLE.COM/a"), Some("HTTPS://EXAMPLE.COM/a"));
        assert_eq!(extract_url("no links here"), None);
    }

    #[test]
    fn test_truncate_tail_utf8_keeps_char_boundaries() {
        assert_eq!(truncate_tail_utf8("hello", 10), "hello");
        assert_eq!(truncate_tail_utf8("hello", 3), "llo");
        assert_eq!(truncate_tail_utf8("привет", 2), "ет");
        assert_eq!(truncate_tail_utf8("abc", 0), "");
    }

    #[test]
    fn test_build_caption_prefers_description() {
        assert_eq!(build_caption("Title", "  Description  ", 1024), "Description");
        assert_eq!(build_caption(" Title ", "   ", 1024), "Title");
        assert_eq!(build_caption("", "", 1024), "");
    }

    #[test]
    fn test_build_caption_truncates_to_exact_length() {
        let long = "a".repeat(2000);
        let caption = build_caption("", &long, 1024);
        assert_eq!(caption.chars().count(), 1024);
        assert!(caption.ends_with('…'));
    }

    #[test]
    fn test_build_caption_never_splits_multibyte_chars() {
        let long = "ж🎬".repeat(700);
        let caption = build_caption("", &long, 1024);
        assert_eq!(caption.chars().count(), 1024);
        assert!(caption.ends_with('…'));
        // Every char before the marker comes from the source text intact.
        assert!(caption
            .chars()
            .take(1023)
            .all(|c| c == 'ж' || c == '🎬'));
    }

    #[test]
    fn test_build_caption_exact_limit_is_untouched() {
        let text = "b".repeat(10);
        assert_eq!(build_caption("", &text, 10), text);
    }
}

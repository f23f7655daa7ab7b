//! Small string and URL helpers shared by the scrapers, the deduplicator and
//! the store writer.
//!
//! - URL canonicalization (the dedup key)
//! - Character-exact truncation for article bodies
//! - Capitalization used when building genre paths
//! - Truncation for log previews

use url::Url;

/// Strip the query string and fragment from an article URL.
///
/// The result is the dedup key used throughout the pipeline. The function is
/// idempotent: canonicalizing an already canonical URL returns it unchanged.
///
/// Absolute URLs go through [`Url`] so the output is in normalized form;
/// anything that does not parse (relative hrefs, junk) is cut at the first
/// `?` or `#` instead.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(
///     canonicalize_url("https://news.yahoo.co.jp/articles/abc?source=rss"),
///     "https://news.yahoo.co.jp/articles/abc"
/// );
/// ```
pub fn canonicalize_url(raw: &str) -> String {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Keep at most `max_chars` characters of `s`.
///
/// Counts Unicode scalar values, not bytes, so Japanese text is never split
/// inside a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// Uppercase the first character and lowercase the rest.
///
/// Used for genre segments: `"sports"` and `"SPORTS"` both become `"Sports"`.
/// Characters without case (kana, kanji) pass through unchanged.
pub fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + &c.as_str().to_lowercase(),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number
/// of characters dropped.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let head = truncate_chars(s, max);
    if head.len() == s.len() {
        s.to_string()
    } else {
        let dropped = s[head.len()..].chars().count();
        format!("{head}…(+{dropped} chars)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_strips_query_and_fragment() {
        assert_eq!(
            canonicalize_url("https://news.yahoo.co.jp/articles/abc123?source=rss&page=2"),
            "https://news.yahoo.co.jp/articles/abc123"
        );
        assert_eq!(
            canonicalize_url("https://news.yahoo.co.jp/articles/abc123#comments"),
            "https://news.yahoo.co.jp/articles/abc123"
        );
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let urls = [
            "https://news.yahoo.co.jp/articles/abc123?x=1",
            "https://news.yahoo.co.jp/articles/abc123",
            "https://news.yahoo.co.jp",
            "/articles/relative?x=1#y",
            "not a url at all?q",
            "",
        ];
        for u in urls {
            let once = canonicalize_url(u);
            assert_eq!(canonicalize_url(&once), once, "not idempotent for {u:?}");
        }
    }

    #[test]
    fn test_canonicalize_relative_falls_back_to_split() {
        assert_eq!(canonicalize_url("/articles/abc?x=1"), "/articles/abc");
    }

    #[test]
    fn test_truncate_chars_exact() {
        let long = "あ".repeat(3500);
        let cut = truncate_chars(&long, 3000);
        assert_eq!(cut.chars().count(), 3000);
        assert!(long.starts_with(cut));

        let short = "短い本文";
        assert_eq!(truncate_chars(short, 3000), short);

        let exact = "a".repeat(3000);
        assert_eq!(truncate_chars(&exact, 3000), exact);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("sports"), "Sports");
        assert_eq!(capitalize("BASEBALL"), "Baseball");
        assert_eq!(capitalize("国内"), "国内");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("short", 100), "short");
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.ends_with("…(+400 chars)"));
    }
}

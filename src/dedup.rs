//! URL-based deduplication.
//!
//! A URL is processed at most once per run and never if the store already
//! holds it. Every URL is canonicalized before it is compared or remembered,
//! so tracking parameters do not defeat the check.

use crate::models::URL_COLUMN;
use crate::utils::canonicalize_url;
use std::collections::HashSet;
use tracing::debug;

/// Canonical URLs found in the store's data rows (header row skipped).
///
/// Rows too short to have a URL column are ignored.
pub fn known_urls(rows: &[Vec<String>]) -> HashSet<String> {
    rows.iter()
        .skip(1)
        .filter_map(|row| row.get(URL_COLUMN))
        .filter(|url| !url.trim().is_empty())
        .map(|url| canonicalize_url(url))
        .collect()
}

/// Tracks which candidate URLs are new for this run.
#[derive(Debug, Default)]
pub struct Deduplicator {
    known: HashSet<String>,
    seen: HashSet<String>,
    skipped: usize,
}

impl Deduplicator {
    pub fn new(known: HashSet<String>) -> Self {
        Self {
            known,
            seen: HashSet::new(),
            skipped: 0,
        }
    }

    /// Canonicalize `raw` and claim it.
    ///
    /// Returns the canonical URL the first time it shows up in this run and
    /// is not already stored; otherwise counts a skip and returns `None`.
    pub fn admit(&mut self, raw: &str) -> Option<String> {
        let url = canonicalize_url(raw);
        if self.known.contains(&url) || !self.seen.insert(url.clone()) {
            debug!(%url, "Already exists");
            self.skipped += 1;
            return None;
        }
        Some(url)
    }

    /// Candidates rejected by [`Deduplicator::admit`] so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn into_known(self) -> HashSet<String> {
        self.known
    }
}

/// Order-preserving filter: canonical candidates not in `known`, each once.
pub fn filter_new<I, S>(known: &HashSet<String>, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut dedup = Deduplicator::new(known.clone());
    candidates
        .into_iter()
        .filter_map(|c| dedup.admit(c.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(urls: &[&str]) -> HashSet<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_filter_new_preserves_order_and_drops_repeats() {
        let known = set(&["https://news.yahoo.co.jp/articles/b"]);
        let candidates = [
            "https://news.yahoo.co.jp/articles/c?source=1",
            "https://news.yahoo.co.jp/articles/a",
            "https://news.yahoo.co.jp/articles/b?source=2",
            "https://news.yahoo.co.jp/articles/c?source=3",
            "https://news.yahoo.co.jp/articles/d",
        ];
        assert_eq!(
            filter_new(&known, candidates),
            vec![
                "https://news.yahoo.co.jp/articles/c",
                "https://news.yahoo.co.jp/articles/a",
                "https://news.yahoo.co.jp/articles/d",
            ]
        );
    }

    #[test]
    fn test_admit_counts_skips() {
        let mut dedup = Deduplicator::new(set(&["https://news.yahoo.co.jp/articles/known"]));
        assert!(dedup.admit("https://news.yahoo.co.jp/articles/known?x=1").is_none());
        assert_eq!(
            dedup.admit("https://news.yahoo.co.jp/articles/new?x=1").as_deref(),
            Some("https://news.yahoo.co.jp/articles/new")
        );
        assert!(dedup.admit("https://news.yahoo.co.jp/articles/new").is_none());
        assert_eq!(dedup.skipped(), 2);
    }

    #[test]
    fn test_known_urls_skips_header_and_short_rows() {
        let rows = vec![
            vec!["ID", "収集時刻", "タイトル", "情報源", "掲載時刻", "URL", "ジャンル", "本文"],
            vec!["1", "t", "title", "p", "time", "https://news.yahoo.co.jp/articles/a", "g", "b"],
            vec!["2", "t", "title"],
            vec!["3", "t", "title", "p", "time", "https://news.yahoo.co.jp/articles/b?x=1"],
        ]
        .into_iter()
        .map(|row| row.into_iter().map(String::from).collect())
        .collect::<Vec<Vec<String>>>();

        assert_eq!(
            known_urls(&rows),
            set(&[
                "https://news.yahoo.co.jp/articles/a",
                "https://news.yahoo.co.jp/articles/b",
            ])
        );
    }
}

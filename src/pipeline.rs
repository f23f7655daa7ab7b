//! The collection run: index → extract → dedup → append.
//!
//! 1. **Indexing**: expand the category page and collect article links
//! 2. **Known URLs**: read the store once to learn what is already recorded
//! 3. **Extraction**: visit each new link in order, one page at a time
//! 4. **Output**: append accepted records to the store in one batch
//!
//! The rendering session is owned by the run and closed before the store is
//! written, whether the crawl succeeded or not.

use crate::config::Config;
use crate::dedup::Deduplicator;
use crate::models::{ArticleRecord, Extraction, RunReport, RunStamp};
use crate::render::RenderSession;
use crate::scrapers::{article, listing};
use crate::store::{self, TabularStore};
use std::collections::HashSet;
use std::error::Error;
use tracing::{debug, info, instrument, warn};

/// Result of the crawl phase.
#[derive(Debug)]
pub struct Crawl {
    pub records: Vec<ArticleRecord>,
    /// URLs known before the run started.
    pub known: HashSet<String>,
    pub candidates: usize,
    pub skipped: usize,
}

/// Visit every new candidate and build records for the acceptable ones.
///
/// Never fails on a single article: failures and rejects are counted as
/// skipped.
#[instrument(level = "info", skip_all, fields(candidates = candidates.len()))]
pub async fn extract_candidates<S: RenderSession>(
    session: &mut S,
    candidates: &[String],
    dedup: &mut Deduplicator,
    config: &Config,
    stamp: &RunStamp,
) -> (Vec<ArticleRecord>, usize) {
    let mut records = Vec::new();
    let mut rejected = 0usize;

    for raw in candidates {
        let Some(url) = dedup.admit(raw) else {
            continue;
        };

        let extraction = article::extract_article(session, &url, config).await;
        match &extraction {
            Extraction::Complete(_) => {}
            Extraction::Degraded { fallbacks, .. } => {
                let fields: Vec<String> = fallbacks
                    .iter()
                    .map(|f| format!("{}: {}", f.field, f.reason))
                    .collect();
                debug!(%url, ?fields, "Extracted with defaults");
            }
            Extraction::Failed { url, reason } => {
                debug!(%url, %reason, "Extraction failed");
            }
        }

        let Some(accepted) = extraction.into_accepted() else {
            info!(%url, "Invalid content, skipping");
            rejected += 1;
            continue;
        };

        info!(title = %accepted.title, %url, genre = %accepted.genre, "Adding article");
        records.push(ArticleRecord::new(stamp, records.len() + 1, accepted));
    }

    (records, rejected + dedup.skipped())
}

/// Known URLs, indexing and extraction, all against one session.
async fn crawl<S: RenderSession, T: TabularStore>(
    session: &mut S,
    store: &mut T,
    config: &Config,
    stamp: &RunStamp,
) -> Result<Crawl, Box<dyn Error>> {
    let candidates = listing::index_articles(session, config).await?;
    let known = store::load_known_urls(store).await?;

    let mut dedup = Deduplicator::new(known);
    let (records, skipped) =
        extract_candidates(session, &candidates, &mut dedup, config, stamp).await;

    Ok(Crawl {
        records,
        known: dedup.into_known(),
        candidates: candidates.len(),
        skipped,
    })
}

/// Run one full collection.
///
/// Takes ownership of `session` and closes it before touching the store
/// for writing, on success and on error alike.
///
/// # Errors
///
/// Listing-page rendering failures and any store failure end the run.
/// Per-article failures do not.
#[instrument(level = "info", skip_all, fields(entry_url = %config.entry_url))]
pub async fn run<S: RenderSession, T: TabularStore>(
    mut session: S,
    store: &mut T,
    config: &Config,
    stamp: &RunStamp,
) -> Result<RunReport, Box<dyn Error>> {
    let crawled = crawl(&mut session, store, config, stamp).await;
    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close browser session");
    }
    let crawled = crawled?;

    let written = if crawled.records.is_empty() {
        info!("No new articles to write");
        0
    } else {
        store::write_records(store, &crawled.records, &crawled.known).await?
    };

    let report = RunReport {
        candidates: crawled.candidates,
        skipped: crawled.skipped,
        added: crawled.records.len(),
        written,
    };
    info!(
        skipped = report.skipped,
        added = report.added,
        written = report.written,
        "Run report"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::fake::FakeSession;
    use crate::store::memory::MemoryStore;

    const ENTRY: &str = "https://news.yahoo.co.jp/categories/domestic";
    const KNOWN: &str = "https://news.yahoo.co.jp/articles/known";
    const BROKEN: &str = "https://news.yahoo.co.jp/articles/broken";
    const FRESH: &str = "https://news.yahoo.co.jp/articles/fresh";

    fn stamp() -> RunStamp {
        RunStamp {
            date: "2025/06/01".to_string(),
            timestamp: "2025/06/01 08:00".to_string(),
        }
    }

    fn test_config() -> Config {
        Config {
            entry_url: ENTRY.to_string(),
            settle_timeout_ms: 0,
            load_more_timeout_ms: 0,
            ..Config::default()
        }
    }

    fn listing(urls: &[&str]) -> String {
        let anchors: String = urls
            .iter()
            .map(|u| format!(r#"<a href="{u}?source=domestic">x</a>"#))
            .collect();
        format!("<html><body>{anchors}</body></html>")
    }

    fn article_page(title: &str, body: &str) -> String {
        format!(
            r#"<html><head><meta property="og:title" content="{title}"></head>
               <body><time>6/1 7:00</time><article><p>{body}</p></article></body></html>"#
        )
    }

    fn known_store() -> MemoryStore {
        let mut store = MemoryStore::with_header();
        store.rows.push(vec![
            "2025/05/31 1".into(),
            "2025/05/31 08:00".into(),
            "昨日の記事".into(),
            "共同通信".into(),
            "5/31 7:00".into(),
            KNOWN.into(),
            "国内".into(),
            "本文".into(),
        ]);
        store
    }

    #[tokio::test]
    async fn test_known_and_failing_candidates_are_skipped() {
        let session = FakeSession::new()
            .with_page(ENTRY, &listing(&[KNOWN, BROKEN, FRESH]))
            .with_page(FRESH, &article_page("新しい記事", "新しい本文。"))
            .failing_on(BROKEN);
        let closed = session.closed.clone();
        let mut store = known_store();

        let report = run(session, &mut store, &test_config(), &stamp()).await.unwrap();

        assert_eq!(report.candidates, 3);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.added, 1);
        assert_eq!(report.written, 1);
        assert!(closed.get());

        assert_eq!(store.rows.len(), 3);
        let row = &store.rows[2];
        assert_eq!(row[0], "2025/06/01 1");
        assert_eq!(row[2], "新しい記事");
        assert_eq!(row[5], FRESH);
        assert_eq!(row[7], "新しい本文。");
    }

    #[tokio::test]
    async fn test_repeated_links_are_visited_once() {
        let session = FakeSession::new()
            .with_page(ENTRY, &listing(&[FRESH, FRESH]))
            .with_page(FRESH, &article_page("記事", "本文。"));
        let mut store = MemoryStore::new();

        let report = run(session, &mut store, &test_config(), &stamp()).await.unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(report.skipped, 1);
        // Header plus one data row.
        assert_eq!(store.rows.len(), 2);
        assert_eq!(store.rows[0][0], "ID");
    }

    #[tokio::test]
    async fn test_article_without_body_is_not_written() {
        let empty_body = r#"<html><head><meta property="og:title" content="見出しだけ"></head><body></body></html>"#;
        let session = FakeSession::new()
            .with_page(ENTRY, &listing(&[FRESH]))
            .with_page(FRESH, empty_body);
        let mut store = MemoryStore::with_header();

        let report = run(session, &mut store, &test_config(), &stamp()).await.unwrap();

        assert_eq!(report.added, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.written, 0);
        assert_eq!(store.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_sequence_ids_count_accepted_records_only() {
        let second = "https://news.yahoo.co.jp/articles/second";
        let session = FakeSession::new()
            .with_page(ENTRY, &listing(&[FRESH, BROKEN, second]))
            .with_page(FRESH, &article_page("一", "本文一。"))
            .with_page(second, &article_page("二", "本文二。"))
            .failing_on(BROKEN);
        let mut store = MemoryStore::with_header();

        run(session, &mut store, &test_config(), &stamp()).await.unwrap();

        assert_eq!(store.rows[1][0], "2025/06/01 1");
        assert_eq!(store.rows[2][0], "2025/06/01 2");
    }

    #[tokio::test]
    async fn test_session_closed_when_listing_fails() {
        let session = FakeSession::new().failing_on(ENTRY);
        let closed = session.closed.clone();
        let mut store = MemoryStore::with_header();

        assert!(run(session, &mut store, &test_config(), &stamp()).await.is_err());
        assert!(closed.get());
        assert_eq!(store.rows.len(), 1);
    }
}

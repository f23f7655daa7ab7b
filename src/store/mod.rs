//! Tabular store access and the append workflow.
//!
//! The collector's only persistence is a spreadsheet: one worksheet, a
//! header row, then one row per article in the column order of
//! [`crate::models::ArticleRecord::to_row`]. The store is consumed through
//! [`TabularStore`] so the workflow can run against Google Sheets
//! ([`sheets::SheetsStore`]) or memory ([`memory::MemoryStore`]).
//!
//! # Submodules
//!
//! - [`auth`]: service-account token exchange for Google APIs
//! - [`sheets`]: Google Sheets / Drive REST client
//! - [`memory`]: in-process store for dry runs and tests

pub mod auth;
pub mod memory;
pub mod sheets;

use crate::config::HEADER_ROW;
use crate::dedup::{filter_new, known_urls};
use crate::models::ArticleRecord;
use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use tracing::{info, instrument};

/// Errors talking to the tabular store.
#[derive(Debug)]
pub enum StoreError {
    /// The service-account key file could not be read or used.
    Credentials(String),
    /// The token endpoint refused the credentials.
    Auth(String),
    /// No spreadsheet with the configured name is visible to the account.
    NotFound(String),
    /// Transport-level failure.
    Http(reqwest::Error),
    /// The API answered with a non-success status.
    Api { status: u16, body: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Credentials(msg) => write!(f, "invalid service-account credentials: {msg}"),
            StoreError::Auth(msg) => write!(f, "authentication failed: {msg}"),
            StoreError::NotFound(name) => write!(f, "spreadsheet {name:?} not found"),
            StoreError::Http(e) => write!(f, "HTTP error: {e}"),
            StoreError::Api { status, body } => write!(f, "API returned {status}: {body}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Http(e)
    }
}

/// Operations the collector needs from a spreadsheet-like store.
pub trait TabularStore {
    /// Every row, header included, as strings.
    async fn read_all_rows(&mut self) -> Result<Vec<Vec<String>>, StoreError>;

    /// Append one row after the last non-empty row.
    async fn append_row(&mut self, row: Vec<String>) -> Result<(), StoreError>;

    /// Append rows in one request; values are stored as-is, not parsed.
    async fn append_rows(&mut self, rows: Vec<Vec<String>>) -> Result<(), StoreError>;
}

/// Canonical URLs already in the store.
#[instrument(level = "info", skip_all)]
pub async fn load_known_urls<T: TabularStore>(store: &mut T) -> Result<HashSet<String>, StoreError> {
    let rows = store.read_all_rows().await?;
    let known = known_urls(&rows);
    info!(count = known.len(), "Fetched existing URLs from the sheet");
    Ok(known)
}

/// Append `records` whose URL is not in `known`.
///
/// Writes the header row first if the store is completely empty. Returns the
/// number of data rows appended.
#[instrument(level = "info", skip_all, fields(records = records.len()))]
pub async fn write_records<T: TabularStore>(
    store: &mut T,
    records: &[ArticleRecord],
    known: &HashSet<String>,
) -> Result<usize, StoreError> {
    info!("Writing new records to the sheet");

    let existing = store.read_all_rows().await?;
    if existing.is_empty() {
        store
            .append_row(HEADER_ROW.iter().map(|h| h.to_string()).collect())
            .await?;
        info!("Header row inserted");
    }

    let fresh: HashSet<String> = filter_new(known, records.iter().map(|r| r.url.as_str()))
        .into_iter()
        .collect();
    let new_rows: Vec<Vec<String>> = records
        .iter()
        .filter(|record| fresh.contains(&record.url))
        .map(ArticleRecord::to_row)
        .collect();
    info!(count = new_rows.len(), "New unique records to write");

    if new_rows.is_empty() {
        info!("No new records to write");
        return Ok(0);
    }

    let written = new_rows.len();
    store.append_rows(new_rows).await?;
    info!(written, "Rows added");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    fn record(n: usize, url: &str) -> ArticleRecord {
        ArticleRecord {
            id: format!("2025/06/01 {n}"),
            collected_at: "2025/06/01 08:00".to_string(),
            title: format!("記事{n}"),
            provider: "共同通信".to_string(),
            published_at: "6/1(日) 7:00".to_string(),
            url: url.to_string(),
            genre: "Domestic".to_string(),
            body: "本文".to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_store_gets_exactly_one_header() {
        let mut store = MemoryStore::new();
        let records = vec![
            record(1, "https://news.yahoo.co.jp/articles/a"),
            record(2, "https://news.yahoo.co.jp/articles/b"),
        ];

        let written = write_records(&mut store, &records, &HashSet::new()).await.unwrap();

        assert_eq!(written, 2);
        assert_eq!(store.rows.len(), 3);
        assert_eq!(store.rows[0], HEADER_ROW.map(String::from).to_vec());
        assert_eq!(store.rows[1][0], "2025/06/01 1");
        assert_eq!(store.rows[2][5], "https://news.yahoo.co.jp/articles/b");
    }

    #[tokio::test]
    async fn test_non_empty_store_gets_no_header() {
        let mut store = MemoryStore::with_header();
        let records = vec![record(1, "https://news.yahoo.co.jp/articles/a")];

        write_records(&mut store, &records, &HashSet::new()).await.unwrap();

        let headers = store.rows.iter().filter(|r| r[0] == "ID").count();
        assert_eq!(headers, 1);
        assert_eq!(store.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_known_urls_are_filtered_again() {
        let mut store = MemoryStore::with_header();
        let known: HashSet<String> = ["https://news.yahoo.co.jp/articles/a".to_string()].into();
        let records = vec![
            record(1, "https://news.yahoo.co.jp/articles/a"),
            record(2, "https://news.yahoo.co.jp/articles/b"),
        ];

        let written = write_records(&mut store, &records, &known).await.unwrap();

        assert_eq!(written, 1);
        assert_eq!(store.rows[1][5], "https://news.yahoo.co.jp/articles/b");
        assert_eq!(store.batch_appends, 1);
    }

    #[tokio::test]
    async fn test_nothing_new_makes_no_append() {
        let mut store = MemoryStore::with_header();
        let written = write_records(&mut store, &[], &HashSet::new()).await.unwrap();
        assert_eq!(written, 0);
        assert_eq!(store.batch_appends, 0);
    }

    #[tokio::test]
    async fn test_load_known_urls() {
        let mut store = MemoryStore::with_header();
        store.rows.push(record(1, "https://news.yahoo.co.jp/articles/a").to_row());
        let known = load_known_urls(&mut store).await.unwrap();
        assert!(known.contains("https://news.yahoo.co.jp/articles/a"));
        assert_eq!(known.len(), 1);
    }
}

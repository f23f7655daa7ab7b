//! Data models for extracted articles and the rows written to the sheet.
//!
//! - [`ExtractedArticle`]: what the extractor read from one article page
//! - [`Extraction`]: the typed outcome of visiting one article
//! - [`ArticleRecord`]: an accepted article stamped with its id and run time
//! - [`RunStamp`]: the per-run date and timestamp shared by every record

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::Serialize;
use std::fmt;

/// Fields read from one article page, before it is accepted into a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedArticle {
    /// Canonical article URL (no query string).
    pub url: String,
    pub title: String,
    pub provider: String,
    /// Publish time as the site prints it.
    pub published_at: String,
    /// Category path such as `"Sports/Baseball"`.
    pub genre: String,
    /// Paragraph text across all pages, already truncated.
    pub body: String,
}

impl ExtractedArticle {
    /// Title and body are mandatory; everything else may be defaulted.
    pub fn is_acceptable(&self) -> bool {
        !self.title.trim().is_empty() && !self.body.trim().is_empty()
    }
}

/// Article fields that can fall back to a default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Field {
    Title,
    Provider,
    Genre,
    PublishedAt,
    Body,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Title => "title",
            Field::Provider => "provider",
            Field::Genre => "genre",
            Field::PublishedAt => "published_at",
            Field::Body => "body",
        };
        f.write_str(name)
    }
}

/// One field that was defaulted, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fallback {
    pub field: Field,
    pub reason: String,
}

impl Fallback {
    pub fn new(field: Field, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Outcome of visiting one article URL.
///
/// The extractor never returns an error; navigation and rendering problems
/// end up in [`Extraction::Failed`] so the run can move on to the next URL.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Every field was read from the page.
    Complete(ExtractedArticle),
    /// The page rendered but some fields fell back to defaults.
    Degraded {
        article: ExtractedArticle,
        fallbacks: Vec<Fallback>,
    },
    /// The page could not be rendered at all.
    Failed { url: String, reason: String },
}

impl Extraction {
    /// Build `Complete` or `Degraded` depending on whether anything fell back.
    pub fn from_parts(article: ExtractedArticle, fallbacks: Vec<Fallback>) -> Self {
        if fallbacks.is_empty() {
            Extraction::Complete(article)
        } else {
            Extraction::Degraded { article, fallbacks }
        }
    }

    /// The article, if it exists and passes the title/body gate.
    pub fn into_accepted(self) -> Option<ExtractedArticle> {
        match self {
            Extraction::Complete(article) | Extraction::Degraded { article, .. }
                if article.is_acceptable() =>
            {
                Some(article)
            }
            _ => None,
        }
    }
}

/// Date and time shared by every record collected in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp {
    /// `YYYY/MM/DD`, prefix of every record id.
    pub date: String,
    /// `YYYY/MM/DD HH:MM`, the "collected at" column.
    pub timestamp: String,
}

impl RunStamp {
    pub fn at<Tz: chrono::TimeZone>(now: DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self {
            date: now.format("%Y/%m/%d").to_string(),
            timestamp: now.format("%Y/%m/%d %H:%M").to_string(),
        }
    }

    /// Stamp for the current instant at the given UTC offset.
    pub fn now(utc_offset_hours: i32) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix());
        Self::at(Utc::now().with_timezone(&offset))
    }
}

/// An accepted article, ready to become a sheet row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleRecord {
    /// `"{date} {counter}"`, e.g. `"2025/06/01 3"`.
    pub id: String,
    pub collected_at: String,
    pub title: String,
    pub provider: String,
    pub published_at: String,
    pub url: String,
    pub genre: String,
    pub body: String,
}

impl ArticleRecord {
    pub fn new(stamp: &RunStamp, sequence: usize, article: ExtractedArticle) -> Self {
        Self {
            id: format!("{} {}", stamp.date, sequence),
            collected_at: stamp.timestamp.clone(),
            title: article.title,
            provider: article.provider,
            published_at: article.published_at,
            url: article.url,
            genre: article.genre,
            body: article.body,
        }
    }

    /// Column order: id, collected-at, title, provider, published-at, url, genre, body.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.collected_at.clone(),
            self.title.clone(),
            self.provider.clone(),
            self.published_at.clone(),
            self.url.clone(),
            self.genre.clone(),
            self.body.clone(),
        ]
    }
}

/// Index of the URL column in a sheet row.
pub const URL_COLUMN: usize = 5;

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Article links found on the category page, duplicates included.
    pub candidates: usize,
    /// Links skipped as duplicates plus articles rejected after extraction.
    pub skipped: usize,
    /// Articles accepted in this run.
    pub added: usize,
    /// Rows actually appended to the store.
    pub written: usize,
}

//! Article page extraction.
//!
//! Turns one article URL into an [`Extraction`]. Every metadata field is
//! read independently and falls back to a default on its own, so a page with
//! odd markup still produces a record; the defaults applied are listed in
//! [`Extraction::Degraded`]. Only a page that cannot be rendered at all ends
//! up as [`Extraction::Failed`].

use super::body::extract_full_body;
use super::genre::resolve_genre;
use crate::config::Config;
use crate::models::{ExtractedArticle, Extraction, Fallback, Field};
use crate::render::{self, RenderSession};
use crate::utils::{truncate_chars, truncate_for_log};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::error::Error;
use tracing::{debug, instrument, warn};

/// Title used when the page has no Open Graph title.
pub const NO_TITLE: &str = "NO TITLE";
/// Provider used when neither meta tags nor JSON-LD name one.
pub const UNKNOWN_PROVIDER: &str = "Unknown";

static OG_TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:title"]"#).expect("static selector"));
static NAMED_META_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[name]").expect("static selector"));
static LD_JSON_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector")
});
static TIME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time").expect("static selector"));
static AUTHOR_META_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)author|publisher").expect("static regex"));

/// Open Graph title, trimmed. `None` if missing or blank.
pub fn extract_title(document: &Html) -> Option<String> {
    document
        .select(&OG_TITLE_SELECTOR)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Author name out of a JSON-LD document.
///
/// `author` may be an object, an array of objects or a bare string.
fn ld_json_author(data: &Value) -> Option<String> {
    let name = match data.get("author")? {
        Value::Object(author) => author.get("name")?.as_str()?,
        Value::Array(authors) => authors
            .iter()
            .find_map(|a| a.get("name").and_then(Value::as_str))?,
        Value::String(name) => name.as_str(),
        _ => return None,
    };
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Publisher or author name.
///
/// The first `<meta>` whose `name` contains "author" or "publisher" (any
/// case) decides; if it carries no content, the first JSON-LD block is tried.
pub fn extract_provider(document: &Html) -> Option<String> {
    let meta_content = document
        .select(&NAMED_META_SELECTOR)
        .find(|meta| {
            meta.value()
                .attr("name")
                .is_some_and(|name| AUTHOR_META_NAME.is_match(name))
        })
        .and_then(|meta| meta.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(content) = meta_content {
        return Some(content.to_string());
    }

    let script = document.select(&LD_JSON_SELECTOR).next()?;
    let raw = script.text().collect::<String>();
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(data) => ld_json_author(&data),
        Err(e) => {
            debug!(error = %e, "Failed to parse ld+json");
            None
        }
    }
}

/// Text of the first `<time>` element, fragments trimmed and concatenated.
pub fn extract_published_at(document: &Html) -> Option<String> {
    document.select(&TIME_SELECTOR).next().map(|time| {
        time.text()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<String>()
    })
}

/// Everything that can be read from the first page's markup alone.
struct PageMetadata {
    title: Option<String>,
    provider: Option<String>,
    published_at: Option<String>,
}

impl PageMetadata {
    fn read(html: &str) -> Self {
        let document = Html::parse_document(html);
        Self {
            title: extract_title(&document),
            provider: extract_provider(&document),
            published_at: extract_published_at(&document),
        }
    }
}

/// Visit `url` and extract an article from it.
///
/// Never fails: navigation and rendering errors become
/// [`Extraction::Failed`]. `url` is expected to be canonical already.
#[instrument(level = "info", skip(session, config))]
pub async fn extract_article<S: RenderSession>(
    session: &mut S,
    url: &str,
    config: &Config,
) -> Extraction {
    match try_extract_article(session, url, config).await {
        Ok(extraction) => extraction,
        Err(e) => {
            warn!(%url, error = %e, "Failed to extract article");
            Extraction::Failed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

async fn try_extract_article<S: RenderSession>(
    session: &mut S,
    url: &str,
    config: &Config,
) -> Result<Extraction, Box<dyn Error>> {
    let html = render::load(session, url, config.settle_timeout()).await?;

    let metadata = PageMetadata::read(&html);
    let mut fallbacks = Vec::new();

    let title = metadata.title.unwrap_or_else(|| {
        fallbacks.push(Fallback::new(Field::Title, "no og:title meta"));
        NO_TITLE.to_string()
    });
    debug!(%title, "Title");

    let provider = metadata.provider.unwrap_or_else(|| {
        fallbacks.push(Fallback::new(Field::Provider, "no author meta or ld+json author"));
        UNKNOWN_PROVIDER.to_string()
    });

    let genre = match resolve_genre(&html) {
        Ok(genre) => genre,
        Err(miss) => {
            debug!(reason = %miss, "Using default genre");
            fallbacks.push(Fallback::new(Field::Genre, miss.to_string()));
            config.default_genre.clone()
        }
    };
    debug!(%genre, "Genre");

    let published_at = metadata.published_at.unwrap_or_else(|| {
        fallbacks.push(Fallback::new(Field::PublishedAt, "no <time> element"));
        String::new()
    });

    let full_body = extract_full_body(
        session,
        url,
        &html,
        config.max_pages,
        config.settle_timeout(),
    )
    .await?;
    if full_body.is_empty() {
        fallbacks.push(Fallback::new(Field::Body, "no paragraphs in article container"));
    }
    let body = truncate_chars(&full_body, config.max_body_chars).to_string();
    debug!(head = %truncate_for_log(&body, 80), "Body head");

    let article = ExtractedArticle {
        url: url.to_string(),
        title,
        provider,
        published_at,
        genre,
        body,
    };
    Ok(Extraction::from_parts(article, fallbacks))
}

//! Article body extraction across paginated views.
//!
//! Long articles are split over `?page=2`, `?page=3`, … . Each view is read
//! for its narrative paragraphs; reading stops at the first view that yields
//! nothing, which is how the end of an article shows up.

use crate::render::{self, RenderSession};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use std::time::Duration;
use tracing::{debug, instrument};

static ARTICLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article").expect("static selector"));
static CLASSED_DIV_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div[class]").expect("static selector"));
static PARAGRAPH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("static selector"));
static ARTICLE_BODY_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)articlebody").expect("static regex"));

/// Elements whose text is never part of the body.
const NON_NARRATIVE: [&str; 5] = ["figure", "aside", "script", "style", "noscript"];

/// URL of the `page`-th view of an article. Page 1 is the base URL itself.
pub fn page_url(base_url: &str, page: usize) -> String {
    if page > 1 {
        format!("{base_url}?page={page}")
    } else {
        base_url.to_string()
    }
}

/// Find the element holding the article text.
///
/// An `<article>` wins; otherwise the first `<div>` with a class token
/// containing "articlebody" in any case.
fn find_container(document: &Html) -> Option<ElementRef<'_>> {
    document.select(&ARTICLE_SELECTOR).next().or_else(|| {
        document.select(&CLASSED_DIV_SELECTOR).find(|div| {
            div.value()
                .classes()
                .any(|class| ARTICLE_BODY_CLASS.is_match(class))
        })
    })
}

fn is_non_narrative(element: ElementRef<'_>) -> bool {
    NON_NARRATIVE.contains(&element.value().name())
}

/// True if `p` sits inside a non-narrative element below `container`.
fn inside_non_narrative(p: ElementRef<'_>, container: ElementRef<'_>) -> bool {
    p.ancestors()
        .take_while(|node| node.id() != container.id())
        .filter_map(ElementRef::wrap)
        .any(is_non_narrative)
}

/// Trimmed text fragments of `element`, skipping non-narrative subtrees.
fn collect_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let text = text.trim();
            if !text.is_empty() {
                out.push(text.to_string());
            }
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !is_non_narrative(child_element) {
                collect_text(child_element, out);
            }
        }
    }
}

/// Paragraph text of one rendered page, one paragraph per line.
///
/// Returns an empty string when the page has no article container or no
/// non-empty paragraphs.
pub fn extract_body(html: &str) -> String {
    let document = Html::parse_document(html);
    let Some(container) = find_container(&document) else {
        debug!("No article container found");
        return String::new();
    };

    let paragraphs: Vec<String> = container
        .select(&PARAGRAPH_SELECTOR)
        .filter(|p| !inside_non_narrative(*p, container))
        .filter_map(|p| {
            let mut fragments = Vec::new();
            collect_text(p, &mut fragments);
            (!fragments.is_empty()).then(|| fragments.join(" "))
        })
        .collect();

    let body = paragraphs.join("\n");
    debug!(chars = body.chars().count(), "Extracted body part");
    body
}

/// Read the body across up to `max_pages` views of `base_url`.
///
/// `first_page` is the already-rendered markup of page 1, so the base URL is
/// not loaded a second time. Later pages are navigated to in order; the first
/// one with an empty body ends the walk.
///
/// # Errors
///
/// Propagates navigation or rendering failures of pages 2 and up.
#[instrument(level = "debug", skip(session, first_page))]
pub async fn extract_full_body<S: RenderSession>(
    session: &mut S,
    base_url: &str,
    first_page: &str,
    max_pages: usize,
    settle_timeout: Duration,
) -> Result<String, Box<dyn Error>> {
    let mut parts: Vec<String> = Vec::new();

    for page in 1..=max_pages {
        let part = if page == 1 {
            extract_body(first_page)
        } else {
            let url = page_url(base_url, page);
            debug!(%url, "Loading page");
            let html = render::load(session, &url, settle_timeout).await?;
            extract_body(&html)
        };

        if part.is_empty() {
            debug!(page, "No content found, stopping");
            break;
        }
        parts.push(part);
    }

    let full = parts.join("\n").trim().to_string();
    debug!(chars = full.chars().count(), pages = parts.len(), "Extracted full body");
    Ok(full)
}

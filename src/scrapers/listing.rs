//! Category page indexing.
//!
//! The category page shows a first batch of articles and a "もっと見る"
//! ("load more") button that appends further batches in place. The
//! collector presses it a bounded number of times, then harvests every
//! article link on the page.
//!
//! A button that is missing or never becomes clickable simply ends the
//! expansion; it is not an error.

use crate::config::Config;
use crate::render::{self, RenderSession};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::error::Error;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument};

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

/// How often the page is re-read while waiting for a batch to arrive.
const LINK_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Every anchor `href` starting with `prefix`, in document order.
///
/// Duplicates and query strings are kept; canonicalization and dedup happen
/// later.
pub fn article_links(html: &str, prefix: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.starts_with(prefix))
        .map(str::to_string)
        .collect()
}

/// Poll the page until it holds more than `previous` article links.
///
/// Returns the links last seen, grown or not once `timeout` runs out.
async fn wait_for_more_links<S: RenderSession>(
    session: &mut S,
    prefix: &str,
    previous: usize,
    timeout: Duration,
) -> Result<Vec<String>, Box<dyn Error>> {
    let deadline = Instant::now() + timeout;
    loop {
        let links = article_links(&session.page_source().await?, prefix);
        if links.len() > previous || Instant::now() >= deadline {
            return Ok(links);
        }
        sleep(LINK_POLL_INTERVAL).await;
    }
}

/// Expand the category page already loaded in `session` and collect its
/// article links.
///
/// # Errors
///
/// Only a failure to read the page before any click propagates. Trouble
/// with the "load more" button, or reading the page after a click, stops
/// expansion and keeps the links collected so far.
#[instrument(level = "info", skip_all)]
pub async fn collect_links<S: RenderSession>(
    session: &mut S,
    config: &Config,
) -> Result<Vec<String>, Box<dyn Error>> {
    let prefix = config.article_url_prefix.as_str();
    let mut links = article_links(&session.page_source().await?, prefix);

    for attempt in 1..=config.load_more_attempts {
        let clickable = session
            .wait_until_clickable(&config.load_more_xpath, config.load_more_timeout())
            .await
            .unwrap_or(false);
        if !clickable {
            info!(attempt, "No more 'load more' button or reached limit");
            break;
        }
        if let Err(e) = session.script_click(&config.load_more_xpath).await {
            info!(attempt, error = %e, "'load more' button went away before the click");
            break;
        }
        let before = links.len();
        match wait_for_more_links(session, prefix, before, config.settle_timeout()).await {
            Ok(more) => {
                links = more;
                debug!(attempt, before, after = links.len(), "Clicked 'load more'");
            }
            Err(e) => {
                info!(attempt, error = %e, "Page unreadable after 'load more'; keeping links so far");
                break;
            }
        }
    }

    info!(count = links.len(), "Found article links");
    Ok(links)
}

/// Load the entry URL and collect its article links.
pub async fn index_articles<S: RenderSession>(
    session: &mut S,
    config: &Config,
) -> Result<Vec<String>, Box<dyn Error>> {
    render::load(session, &config.entry_url, config.settle_timeout()).await?;
    collect_links(session, config).await
}

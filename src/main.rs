//! # Yahoo News Sheet
//!
//! Collects articles from a Yahoo! News Japan category page and appends the
//! new ones to a Google Sheets spreadsheet, one row per article.
//!
//! ## Features
//!
//! - Expands the category listing by clicking its "load more" button
//! - Extracts title, provider, publish time, genre and paginated body text
//! - Skips URLs already recorded in the sheet, ignoring query strings
//! - Writes a header row into an empty sheet, then appends in one batch
//!
//! ## Usage
//!
//! ```sh
//! yahoo_news_sheet --credentials ./credentials.json --spreadsheet "ニュース収集シート"
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Indexing**: Collect article URLs from the category page
//! 2. **Deduplication**: Drop URLs the sheet already holds
//! 3. **Extraction**: Render each article and read its fields
//! 4. **Output**: Append accepted records to the sheet

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod dedup;
mod models;
mod pipeline;
mod render;
mod scrapers;
mod store;
mod utils;

use cli::Cli;
use models::RunStamp;
use render::chrome::ChromeSession;
use store::memory::MemoryStore;
use store::sheets::SheetsStore;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("yahoo_news_sheet starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.config, dry_run = args.dry_run, "Parsed CLI arguments");

    let config = config::resolve(&args).await?;
    let stamp = RunStamp::now(config.utc_offset_hours);
    info!(
        entry_url = %config.entry_url,
        spreadsheet = %config.spreadsheet_name,
        collected_at = %stamp.timestamp,
        "Configuration loaded"
    );

    let report = if args.dry_run {
        let mut store = MemoryStore::new();
        let session = ChromeSession::launch(&config).await?;
        let report = pipeline::run(session, &mut store, &config, &stamp).await?;
        for row in &store.rows {
            info!(row = ?row, "Dry-run row");
        }
        report
    } else {
        // Open the sheet before launching the browser so bad credentials fail fast.
        let mut store = match SheetsStore::open(&config.credentials_path, &config.spreadsheet_name).await {
            Ok(store) => store,
            Err(e) => {
                error!(error = %e, "Failed to open spreadsheet");
                return Err(e.into());
            }
        };
        let session = ChromeSession::launch(&config).await?;
        match pipeline::run(session, &mut store, &config, &stamp).await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Run failed");
                return Err(e);
            }
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        candidates = report.candidates,
        skipped = report.skipped,
        added = report.added,
        written = report.written,
        "Execution complete"
    );

    Ok(())
}

//! Command-line interface definitions.
//!
//! Every flag is optional: with no arguments the collector runs against the
//! built-in defaults in [`crate::config::Config`]. Flags override values
//! loaded from `--config`.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the collector.
///
/// # Examples
///
/// ```sh
/// # Defaults: credentials.json in the working directory
/// yahoo_news_sheet
///
/// # Explicit key file and sheet, visible browser
/// yahoo_news_sheet --credentials ./sa.json --spreadsheet "News" --headful
///
/// # Scrape only, print what would be written
/// yahoo_news_sheet --dry-run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Service-account key file for the Google Sheets API
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Name of the spreadsheet to append to
    #[arg(short, long, env = "NEWS_SHEET_NAME")]
    pub spreadsheet: Option<String>,

    /// Category page to collect article links from
    #[arg(short, long)]
    pub entry_url: Option<String>,

    /// Chromium/Chrome executable to launch
    #[arg(long, env = "CHROME_PATH")]
    pub chrome: Option<PathBuf>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headful: bool,

    /// Collect and extract, but keep rows in memory instead of writing the sheet
    #[arg(long)]
    pub dry_run: bool,
}

//! Run configuration.
//!
//! Every knob the pipeline reads lives in [`Config`]. Values come from three
//! layers, later layers winning:
//!
//! 1. Built-in defaults (the values the collector has always used)
//! 2. An optional YAML file passed with `--config`
//! 3. Individual CLI flags / environment variables (see [`crate::cli::Cli`])
//!
//! # Example file
//!
//! ```yaml
//! credentials_path: /etc/news/credentials.json
//! spreadsheet_name: ニュース収集シート
//! max_pages: 3
//! settle_timeout_ms: 4000
//! ```

use crate::cli::Cli;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, instrument};
use url::Url;

/// Header row written to an empty sheet, in column order.
pub const HEADER_ROW: [&str; 8] = [
    "ID",
    "収集時刻",
    "タイトル",
    "情報源",
    "掲載時刻",
    "URL",
    "ジャンル",
    "本文",
];

/// All tunables for one collection run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Path to the Google service-account key file.
    pub credentials_path: PathBuf,
    /// Name of the spreadsheet to append to (its first worksheet is used).
    pub spreadsheet_name: String,
    /// Category page the listing phase starts from.
    pub entry_url: String,
    /// Only anchors whose `href` starts with this are treated as articles.
    pub article_url_prefix: String,
    /// Maximum number of paginated body views read per article.
    pub max_pages: usize,
    /// Body length budget, in characters.
    pub max_body_chars: usize,
    /// Upper bound on each "page ready" / "more links arrived" wait.
    pub settle_timeout_ms: u64,
    /// XPath of the "load more" button on the category page.
    pub load_more_xpath: String,
    /// How many times the "load more" button is pressed at most.
    pub load_more_attempts: usize,
    /// How long to wait for the "load more" button to become clickable.
    pub load_more_timeout_ms: u64,
    /// Genre used when the page carries no usable category data.
    pub default_genre: String,
    /// Offset from UTC used for record ids and collection timestamps.
    pub utc_offset_hours: i32,
    /// Run Chromium without a window.
    pub headless: bool,
    /// Explicit Chromium/Chrome binary; auto-detected when unset.
    pub chrome_executable: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("credentials.json"),
            spreadsheet_name: "ニュース収集シート".to_string(),
            entry_url: "https://news.yahoo.co.jp/categories/domestic".to_string(),
            article_url_prefix: "https://news.yahoo.co.jp/articles/".to_string(),
            max_pages: 5,
            max_body_chars: 3000,
            settle_timeout_ms: 2000,
            load_more_xpath: "//button[contains(text(),'もっと見る')]".to_string(),
            load_more_attempts: 5,
            load_more_timeout_ms: 5000,
            default_genre: "国内".to_string(),
            utc_offset_hours: 9,
            headless: true,
            chrome_executable: None,
        }
    }
}

impl Config {
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    pub fn load_more_timeout(&self) -> Duration {
        Duration::from_millis(self.load_more_timeout_ms)
    }

    /// Layer CLI flags on top of this configuration.
    ///
    /// Only flags that were actually given override; `--headful` can switch
    /// headless mode off but never back on.
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if let Some(path) = &cli.credentials {
            self.credentials_path = path.clone();
        }
        if let Some(name) = &cli.spreadsheet {
            self.spreadsheet_name = name.clone();
        }
        if let Some(url) = &cli.entry_url {
            self.entry_url = url.clone();
        }
        if let Some(chrome) = &cli.chrome {
            self.chrome_executable = Some(chrome.clone());
        }
        if cli.headful {
            self.headless = false;
        }
        self
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        Url::parse(&self.entry_url)
            .map_err(|e| format!("entry_url {:?} is not a valid URL: {e}", self.entry_url))?;
        if self.article_url_prefix.is_empty() {
            return Err("article_url_prefix must not be empty".into());
        }
        if self.max_pages == 0 {
            return Err("max_pages must be at least 1".into());
        }
        if self.max_body_chars == 0 {
            return Err("max_body_chars must be at least 1".into());
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(format!(
                "utc_offset_hours {} is outside -12..=14",
                self.utc_offset_hours
            )
            .into());
        }
        Ok(())
    }
}

/// Load a YAML configuration file.
///
/// Missing keys keep their defaults, so a file only needs the values it
/// changes.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_config(path: &std::path::Path) -> Result<Config, Box<dyn Error>> {
    let raw = fs::read_to_string(path).await?;
    let config: Config = serde_yaml::from_str(&raw)?;
    debug!(?config, "Parsed configuration file");
    info!("Loaded configuration file");
    Ok(config)
}

/// Build the effective configuration for this run from the CLI.
pub async fn resolve(cli: &Cli) -> Result<Config, Box<dyn Error>> {
    let base = match &cli.config {
        Some(path) => load_config(path).await?,
        None => Config::default(),
    };
    let config = base.apply_cli(cli);
    config.validate()?;
    Ok(config)
}

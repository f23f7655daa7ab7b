//! Headless Chromium session over the DevTools protocol.
//!
//! Launches one browser process with one tab. The CDP event handler runs on
//! its own task for the lifetime of the session; [`ChromeSession::close`]
//! shuts the browser down, waits for the process to exit and stops the
//! handler.

use super::RenderSession;
use crate::config::Config;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::error::Error;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument, warn};

/// How often readiness conditions are re-checked.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Returns true when the element is rendered with a non-zero box and is not
/// disabled.
const CLICKABLE_JS: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return !this.disabled
        && rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden' && style.display !== 'none';
}"#;

const CLICK_JS: &str = "function() { this.click(); }";

pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl std::fmt::Debug for ChromeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromeSession").finish_non_exhaustive()
    }
}

impl ChromeSession {
    /// Launch Chromium according to `config` and open a blank tab.
    ///
    /// # Errors
    ///
    /// Fails if no browser binary can be found or started.
    #[instrument(level = "info", skip_all, fields(headless = config.headless))]
    pub async fn launch(config: &Config) -> Result<Self, Box<dyn Error>> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .window_size(1280, 1024);
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build()?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler event error");
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        info!("Browser session started");

        Ok(Self {
            browser,
            page,
            handler,
        })
    }
}

impl RenderSession for ChromeSession {
    #[instrument(level = "debug", skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<(), Box<dyn Error>> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String, Box<dyn Error>> {
        Ok(self.page.content().await?)
    }

    async fn wait_until_ready(&mut self, timeout: Duration) -> Result<bool, Box<dyn Error>> {
        let deadline = Instant::now() + timeout;
        loop {
            let state: String = self
                .page
                .evaluate("document.readyState")
                .await?
                .into_value()?;
            if state == "complete" {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_until_clickable(
        &mut self,
        xpath: &str,
        timeout: Duration,
    ) -> Result<bool, Box<dyn Error>> {
        let deadline = Instant::now() + timeout;
        loop {
            // A missing element is an expected state here, not an error.
            if let Ok(element) = self.page.find_xpath(xpath).await {
                let clickable = element
                    .call_js_fn(CLICKABLE_JS, false)
                    .await?
                    .result
                    .value
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                if clickable {
                    return Ok(true);
                }
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn script_click(&mut self, xpath: &str) -> Result<(), Box<dyn Error>> {
        let element = self.page.find_xpath(xpath).await?;
        element.call_js_fn(CLICK_JS, false).await?;
        Ok(())
    }

    #[instrument(level = "info", skip_all)]
    async fn close(mut self) -> Result<(), Box<dyn Error>> {
        let result = async {
            self.browser.close().await?;
            self.browser.wait().await?;
            Ok::<(), Box<dyn Error>>(())
        }
        .await;
        self.handler.abort();
        match &result {
            Ok(()) => info!("Browser session closed"),
            Err(e) => warn!(error = %e, "Browser did not shut down cleanly"),
        }
        result
    }
}

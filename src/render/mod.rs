//! Rendering session abstraction.
//!
//! The scrapers never talk to a browser directly; they drive a
//! [`RenderSession`]. Production runs use [`chrome::ChromeSession`], a
//! headless Chromium over the DevTools protocol. Tests use a scripted fake.
//!
//! A session is a single tab that is navigated serially: the listing phase
//! and every article visit reuse it, and it is closed exactly once when the
//! run ends.

pub mod chrome;

use std::error::Error;
use std::time::Duration;

/// Operations the pipeline needs from a browser tab.
pub trait RenderSession {
    /// Load `url` in the tab.
    async fn navigate(&mut self, url: &str) -> Result<(), Box<dyn Error>>;

    /// Serialized DOM of the current page, after scripts ran.
    async fn page_source(&mut self) -> Result<String, Box<dyn Error>>;

    /// Wait until the page reports it finished loading.
    ///
    /// Returns `Ok(false)` when `timeout` elapses first; callers go on with
    /// whatever has rendered so far.
    async fn wait_until_ready(&mut self, timeout: Duration) -> Result<bool, Box<dyn Error>>;

    /// Wait until the element at `xpath` exists, is visible and enabled.
    ///
    /// Returns `Ok(false)` on timeout.
    async fn wait_until_clickable(
        &mut self,
        xpath: &str,
        timeout: Duration,
    ) -> Result<bool, Box<dyn Error>>;

    /// Click the element at `xpath` by calling its `click()` from a script.
    async fn script_click(&mut self, xpath: &str) -> Result<(), Box<dyn Error>>;

    /// Release the tab and the browser behind it.
    async fn close(self) -> Result<(), Box<dyn Error>>;
}

/// Navigate and wait for the page to settle, logging a timeout instead of
/// failing on it.
pub async fn load<S: RenderSession>(
    session: &mut S,
    url: &str,
    settle_timeout: Duration,
) -> Result<String, Box<dyn Error>> {
    session.navigate(url).await?;
    if !session.wait_until_ready(settle_timeout).await? {
        tracing::debug!(%url, ?settle_timeout, "Page not ready before timeout; reading anyway");
    }
    session.page_source().await
}

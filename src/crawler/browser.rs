//! Headless Chrome browsing contexts
//!
//! Each worker gets its own Chrome process with a private profile directory,
//! so cookies and caches are never shared. Pages are opened in a fresh tab
//! per navigation and closed once their content has been read.

use crate::crawler::fetcher::{is_rendered, BrowserSettings, ContextFactory, PageRenderer};
use crate::{ArchiverError, FetchError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use scraper::Selector;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

/// Pause between render-complete checks while a page settles
const RENDER_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Context factory that launches one Chrome instance per worker
#[derive(Debug, Clone)]
pub struct ChromeContextFactory {
    settings: BrowserSettings,
}

impl ChromeContextFactory {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    fn profile_dir(worker: usize) -> PathBuf {
        std::env::temp_dir().join(format!(
            "newsday-archiver-{}-{}",
            std::process::id(),
            worker
        ))
    }
}

#[async_trait]
impl ContextFactory for ChromeContextFactory {
    async fn new_context(&self, worker: usize) -> Result<Box<dyn PageRenderer>, ArchiverError> {
        let browser_error = |message: String| ArchiverError::Browser { worker, message };

        let ready_selector = Selector::parse(&self.settings.ready_selector).map_err(|e| {
            browser_error(format!(
                "ready-selector '{}': {:?}",
                self.settings.ready_selector, e
            ))
        })?;

        let mut builder = BrowserConfig::builder()
            .request_timeout(self.settings.timeout)
            .user_data_dir(Self::profile_dir(worker))
            .arg(format!("--user-agent={}", self.settings.user_agent));
        if !self.settings.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(browser_error)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| browser_error(e.to_string()))?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(worker, "Browser event error: {}", e);
                }
            }
        });

        tracing::debug!(worker, headless = self.settings.headless, "Launched Chrome context");

        Ok(Box::new(ChromeRenderer {
            browser,
            events,
            ready_selector,
            ready_source: self.settings.ready_selector.clone(),
            timeout: self.settings.timeout,
        }))
    }
}

/// A browsing context backed by one Chrome process
pub struct ChromeRenderer {
    browser: Browser,
    events: JoinHandle<()>,
    ready_selector: Selector,
    ready_source: String,
    timeout: Duration,
}

impl ChromeRenderer {
    /// Reads the page until the ready selector matches or `deadline` passes
    async fn settled_content(
        &self,
        page: &Page,
        url: &str,
        deadline: Instant,
    ) -> Result<String, FetchError> {
        if let Some(status) = navigation_status(page).await {
            if !(200..400).contains(&status) {
                return Err(FetchError::Http { status });
            }
        }

        loop {
            let content = page.content().await.map_err(classify_cdp_error)?;
            if is_rendered(&content, &self.ready_selector) {
                return Ok(content);
            }
            if Instant::now() + RENDER_POLL_INTERVAL > deadline {
                return Err(FetchError::Render(format!(
                    "'{}' not present in {}",
                    self.ready_source, url
                )));
            }
            tokio::time::sleep(RENDER_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&mut self, url: &str) -> Result<String, FetchError> {
        Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        let deadline = Instant::now() + self.timeout;
        let page = tokio::time::timeout(self.timeout, self.browser.new_page(url))
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(classify_cdp_error)?;

        let result = self.settled_content(&page, url, deadline).await;

        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close tab for {}: {}", url, e);
        }
        result
    }
}

impl Drop for ChromeRenderer {
    fn drop(&mut self) {
        self.events.abort();
    }
}

/// HTTP status of the page's main navigation, when Chrome reported one
async fn navigation_status(page: &Page) -> Option<u16> {
    let request = page.wait_for_navigation_response().await.ok()??;
    let status = request.response.as_ref()?.status;
    u16::try_from(status).ok()
}

/// Maps a DevTools protocol error onto the fetch error taxonomy
fn classify_cdp_error(error: CdpError) -> FetchError {
    match error {
        CdpError::Timeout => FetchError::Timeout,
        other => FetchError::Network(other.to_string()),
    }
}

//! Page fetching
//!
//! This module handles every page navigation the crawler makes:
//! - Browsing contexts (`PageRenderer`), one per worker, created by a `ContextFactory`
//! - The reqwest-backed context with its render-complete check
//! - Retry with exponential backoff (`PageFetcher`)
//! - Error classification

use crate::config::Config;
use crate::crawler::retry::{RetryAction, RetryPolicy};
use crate::state::TargetState;
use crate::{ArchiverError, FetchError};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// What a target is and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
    /// Archive-index page for one calendar day
    Index { day: NaiveDate },
    /// Article page linked from an archive-index page
    Article { source_url: String },
}

/// One unit of fetch work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub url: String,
    pub kind: TargetKind,
}

impl FetchTarget {
    pub fn index(url: impl Into<String>, day: NaiveDate) -> Self {
        Self {
            url: url.into(),
            kind: TargetKind::Index { day },
        }
    }

    pub fn article(url: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: TargetKind::Article {
                source_url: source_url.into(),
            },
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self.kind, TargetKind::Index { .. })
    }
}

/// Rendered page content for a target
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub target: FetchTarget,
    pub content: String,
}

/// A target that could not be fetched within its retry budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub target: FetchTarget,
    pub error: FetchError,
    pub attempts: u32,
}

/// A browsing context: performs one navigation per call
///
/// Implementations return only once the page's main content is present, not
/// merely when the response headers have arrived. A context is owned by a
/// single worker and is never shared.
#[async_trait]
pub trait PageRenderer: Send {
    async fn render(&mut self, url: &str) -> Result<String, FetchError>;
}

/// Creates one isolated browsing context per worker
#[async_trait]
pub trait ContextFactory: Send + Sync {
    async fn new_context(&self, worker: usize) -> Result<Box<dyn PageRenderer>, ArchiverError>;
}

/// Settings shared by every browsing context of a run
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub user_agent: String,
    pub timeout: Duration,
    pub headless: bool,
    /// Selector that marks a page as rendered
    pub ready_selector: String,
}

impl BrowserSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            user_agent: config.user_agent.value.clone(),
            timeout: Duration::from_secs(config.crawler.request_timeout_secs),
            headless: config.crawler.headless,
            ready_selector: config.site.ready_selector.clone(),
        }
    }
}

/// Context factory backed by reqwest
///
/// Each context gets its own client, connection pool and cookie jar, so
/// workers share no session state.
#[derive(Debug, Clone)]
pub struct HttpContextFactory {
    settings: BrowserSettings,
}

impl HttpContextFactory {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ContextFactory for HttpContextFactory {
    async fn new_context(&self, worker: usize) -> Result<Box<dyn PageRenderer>, ArchiverError> {
        if !self.settings.headless {
            tracing::debug!(worker, "HTTP contexts have no window; ignoring headed mode");
        }
        let renderer = HttpRenderer::new(&self.settings).map_err(|message| {
            ArchiverError::Browser { worker, message }
        })?;
        tracing::debug!(worker, "Opened browsing context");
        Ok(Box::new(renderer))
    }
}

/// A browsing context that fetches pages over HTTP
pub struct HttpRenderer {
    client: Client,
    ready_selector: Selector,
    ready_source: String,
}

impl HttpRenderer {
    /// Builds a context with its own client
    ///
    /// # Returns
    ///
    /// * `Ok(HttpRenderer)` - Ready to navigate
    /// * `Err(String)` - The client or the ready selector could not be built
    pub fn new(settings: &BrowserSettings) -> Result<Self, String> {
        let client = build_http_client(settings).map_err(|e| e.to_string())?;
        let ready_selector = Selector::parse(&settings.ready_selector)
            .map_err(|e| format!("ready-selector '{}': {:?}", settings.ready_selector, e))?;

        Ok(Self {
            client,
            ready_selector,
            ready_source: settings.ready_selector.clone(),
        })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&mut self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(classify_error)?;

        if !is_rendered(&body, &self.ready_selector) {
            return Err(FetchError::Render(format!(
                "'{}' not present in {}",
                self.ready_source, url
            )));
        }

        Ok(body)
    }
}

/// Builds an HTTP client for one browsing context
pub fn build_http_client(settings: &BrowserSettings) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.timeout)
        .connect_timeout(Duration::from_secs(10))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Render-complete check: the ready selector matches in the document
pub(crate) fn is_rendered(body: &str, ready: &Selector) -> bool {
    Html::parse_document(body).select(ready).next().is_some()
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_builder() {
        FetchError::InvalidUrl(error.to_string())
    } else if let Some(status) = error.status() {
        FetchError::Http {
            status: status.as_u16(),
        }
    } else {
        FetchError::Network(error.to_string())
    }
}

/// Fetches targets through one browsing context, retrying transient failures
pub struct PageFetcher {
    renderer: Box<dyn PageRenderer>,
    policy: RetryPolicy,
    worker: usize,
}

impl PageFetcher {
    pub fn new(renderer: Box<dyn PageRenderer>, policy: RetryPolicy, worker: usize) -> Self {
        Self {
            renderer,
            policy,
            worker,
        }
    }

    /// Fetches `target`, retrying per the policy
    ///
    /// Never propagates an error: once the budget is exhausted, or on the
    /// first terminal error, the failure is returned as a `FetchFailure` so
    /// the caller can move on to the next target.
    pub async fn fetch(&mut self, target: FetchTarget) -> Result<FetchedPage, FetchFailure> {
        let mut state = TargetState::Pending;
        let mut attempt = 1;

        loop {
            state = self.advance(state, TargetState::Fetching { attempt }, &target);

            let error = match self.renderer.render(&target.url).await {
                Ok(content) => {
                    self.advance(state, TargetState::Succeeded, &target);
                    return Ok(FetchedPage { target, content });
                }
                Err(error) => error,
            };

            match self.policy.next_action(attempt, &error) {
                RetryAction::Retry(delay) => {
                    tracing::debug!(
                        worker = self.worker,
                        url = %target.url,
                        attempt,
                        error = %error,
                        "Fetch failed, retrying in {:?}",
                        delay
                    );
                    state = self.advance(state, TargetState::Retrying { attempt, delay }, &target);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryAction::GiveUp => {
                    self.advance(state, TargetState::Failed, &target);
                    return Err(FetchFailure {
                        target,
                        error,
                        attempts: attempt,
                    });
                }
            }
        }
    }

    fn advance(&self, from: TargetState, to: TargetState, target: &FetchTarget) -> TargetState {
        match from.transition(to) {
            Ok(next) => {
                tracing::trace!(worker = self.worker, url = %target.url, state = %next);
                next
            }
            Err(e) => {
                tracing::error!(worker = self.worker, url = %target.url, "{}", e);
                to
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays scripted results and counts navigations
    struct Scripted {
        results: VecDeque<Result<String, FetchError>>,
        calls: Arc<Mutex<u32>>,
    }

    #[async_trait]
    impl PageRenderer for Scripted {
        async fn render(&mut self, _url: &str) -> Result<String, FetchError> {
            *self.calls.lock().unwrap() += 1;
            self.results
                .pop_front()
                .unwrap_or(Err(FetchError::Network("script exhausted".into())))
        }
    }

    fn fetcher(results: Vec<Result<String, FetchError>>) -> (PageFetcher, Arc<Mutex<u32>>) {
        let calls = Arc::new(Mutex::new(0));
        let renderer = Scripted {
            results: results.into(),
            calls: calls.clone(),
        };
        let policy = RetryPolicy::new(Duration::from_millis(1));
        (PageFetcher::new(Box::new(renderer), policy, 0), calls)
    }

    fn target() -> FetchTarget {
        FetchTarget::article("https://example.com/a", "https://example.com/2020/01/01/")
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let (mut fetcher, calls) = fetcher(vec![
            Err(FetchError::Timeout),
            Err(FetchError::Http { status: 503 }),
            Ok("<html></html>".to_string()),
        ]);
        let page = fetcher.fetch(target()).await.unwrap();
        assert_eq!(page.content, "<html></html>");
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_transient_exhausts_three_attempts() {
        let (mut fetcher, calls) = fetcher(vec![
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
            Ok("never reached".to_string()),
        ]);
        let failure = fetcher.fetch(target()).await.unwrap_err();
        assert_eq!(failure.attempts, 3);
        assert_eq!(failure.error, FetchError::Timeout);
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_terminal_error_single_attempt() {
        let (mut fetcher, calls) = fetcher(vec![
            Err(FetchError::Http { status: 404 }),
            Ok("never reached".to_string()),
        ]);
        let failure = fetcher.fetch(target()).await.unwrap_err();
        assert_eq!(failure.attempts, 1);
        assert_eq!(failure.error, FetchError::Http { status: 404 });
        assert_eq!(failure.target, target());
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_is_rendered() {
        let ready = Selector::parse("main").unwrap();
        assert!(is_rendered("<html><body><main>x</main></body></html>", &ready));
        assert!(!is_rendered("<html><body><div id=app></div></body></html>", &ready));
    }

    #[test]
    fn test_default_ready_selector_needs_main_content() {
        let settings = BrowserSettings::from_config(&Config::default());
        let ready = Selector::parse(&settings.ready_selector).unwrap();

        assert!(!is_rendered("", &ready));
        assert!(!is_rendered("<html><body></body></html>", &ready));
        assert!(!is_rendered("<html><body><div id=app></div></body></html>", &ready));
        assert!(is_rendered("<html><body><article>x</article></body></html>", &ready));
        assert!(is_rendered(
            "<html><body><div class=entry-content>x</div></body></html>",
            &ready
        ));
    }

    #[tokio::test]
    async fn test_factory_creates_independent_contexts() {
        let factory = HttpContextFactory::new(BrowserSettings::from_config(&Config::default()));
        assert!(factory.new_context(0).await.is_ok());
        assert!(factory.new_context(1).await.is_ok());
    }

    #[tokio::test]
    async fn test_factory_rejects_bad_ready_selector() {
        let mut settings = BrowserSettings::from_config(&Config::default());
        settings.ready_selector = "main[[".to_string();
        let factory = HttpContextFactory::new(settings);
        assert!(matches!(
            factory.new_context(3).await,
            Err(ArchiverError::Browser { worker: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_http_renderer_rejects_malformed_url() {
        let mut renderer =
            HttpRenderer::new(&BrowserSettings::from_config(&Config::default())).unwrap();
        let result = renderer.render("not a url").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }
}

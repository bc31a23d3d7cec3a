//! Crawler module for archive traversal and article extraction
//!
//! This module contains the core crawling logic, including:
//! - Page fetching through per-worker browsing contexts, with retry logic
//! - Index-page link extraction and article-page field extraction
//! - Day distribution and per-worker pacing
//! - Overall crawl coordination

#[cfg(feature = "browser")]
mod browser;
mod coordinator;
mod fetcher;
mod parser;
mod retry;
mod scheduler;

#[cfg(feature = "browser")]
pub use browser::{ChromeContextFactory, ChromeRenderer};
pub use coordinator::{Coordinator, CrawlOutcome, CrawlReport};
pub use fetcher::{
    build_http_client, BrowserSettings, ContextFactory, FetchFailure, FetchTarget, FetchedPage,
    HttpContextFactory, HttpRenderer, PageFetcher, PageRenderer, TargetKind,
};
pub use parser::{normalize_date, ArticleParser, IndexEntry, IndexParser};
pub use retry::{RetryAction, RetryPolicy, MAX_ATTEMPTS};
pub use scheduler::{DayQueue, Pacer};

use crate::config::Config;
use crate::ArchiverError;

/// Runs a complete crawl with the configured kind of browsing context
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Validate the configuration
/// 2. Plan the days to visit
/// 3. Open one browsing context per worker
/// 4. Crawl every day's index and articles
/// 5. Return the collected records with a failure report
///
/// # Example
///
/// ```no_run
/// use newsday_archiver::config::load_config;
/// use newsday_archiver::crawler::crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let outcome = crawl(config).await?;
/// println!("{} articles", outcome.store.len());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: Config) -> Result<CrawlOutcome, ArchiverError> {
    Coordinator::with_browser(config)?.run().await
}

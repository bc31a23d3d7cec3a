//! Crawl coordinator - main crawl orchestration logic
//!
//! This module drives the whole pipeline:
//! - Opening one isolated browsing context per worker before any work starts
//! - Handing out calendar days to a fixed-size worker pool
//! - Fetching each day's index page, then every article it links to
//! - Merging extracted records into the shared result store
//! - Accounting for every failed day or article by error kind
//! - Stopping cooperatively between targets when cancelled

use crate::config::{Config, RendererKind};
use crate::crawler::fetcher::{
    BrowserSettings, ContextFactory, FetchFailure, FetchTarget, HttpContextFactory, PageFetcher,
};
use crate::crawler::parser::{ArticleParser, IndexEntry, IndexParser};
use crate::crawler::retry::RetryPolicy;
use crate::crawler::scheduler::{DayQueue, Pacer};
use crate::schedule::{DateRange, IndexUrlTemplate};
use crate::state::{CrawlProgress, ProgressSnapshot};
use crate::store::ResultStore;
use crate::{ArchiverError, ConfigError};
use chrono::{Local, NaiveDate};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Accounting for a finished (or cancelled) run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Final counter values
    pub progress: ProgressSnapshot,
    /// Every target that was given up on, in the order workers reported them
    pub failures: Vec<FetchFailure>,
    /// Whether the run stopped because of the cancellation token
    pub cancelled: bool,
    pub elapsed: Duration,
    /// Workers that ended abnormally; their unfinished days are lost
    pub aborted_workers: usize,
}

/// Everything a run produces
#[derive(Debug)]
pub struct CrawlOutcome {
    pub store: Arc<ResultStore>,
    pub report: CrawlReport,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    factory: Arc<dyn ContextFactory>,
    template: Arc<IndexUrlTemplate>,
    index_parser: Arc<IndexParser>,
    article_parser: Arc<ArticleParser>,
    policy: RetryPolicy,
    store: Arc<ResultStore>,
    progress: Arc<CrawlProgress>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// All configuration problems surface here, before any worker starts.
    ///
    /// # Arguments
    ///
    /// * `config` - The archiver configuration
    /// * `factory` - Source of per-worker browsing contexts
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(ConfigError)` - The configuration is unusable
    pub fn new(config: Config, factory: Arc<dyn ContextFactory>) -> Result<Self, ConfigError> {
        crate::config::validate(&config)?;

        let template = IndexUrlTemplate::new(&config.site.base_url, &config.site.index_path)?;
        let index_parser = IndexParser::new(&config.site)?;
        let article_parser = ArticleParser::new(&config.selectors)?;
        let policy = RetryPolicy::new(Duration::from_millis(config.crawler.retry_base_delay_ms));

        Ok(Self {
            config,
            factory,
            template: Arc::new(template),
            index_parser: Arc::new(index_parser),
            article_parser: Arc::new(article_parser),
            policy,
            store: Arc::new(ResultStore::new()),
            progress: Arc::new(CrawlProgress::new()),
            cancel: CancellationToken::new(),
        })
    }

    /// Creates a coordinator whose workers fetch over HTTP
    pub fn with_http_browser(config: Config) -> Result<Self, ConfigError> {
        let factory = HttpContextFactory::new(BrowserSettings::from_config(&config));
        Self::new(config, Arc::new(factory))
    }

    /// Creates a coordinator using the renderer named in the configuration
    pub fn with_browser(config: Config) -> Result<Self, ConfigError> {
        match config.crawler.renderer {
            RendererKind::Http => Self::with_http_browser(config),
            #[cfg(feature = "browser")]
            RendererKind::Chrome => {
                let settings = BrowserSettings::from_config(&config);
                let factory = crate::crawler::browser::ChromeContextFactory::new(settings);
                Self::new(config, Arc::new(factory))
            }
            #[cfg(not(feature = "browser"))]
            RendererKind::Chrome => Err(ConfigError::Validation(
                "renderer \"chrome\" requires a build with the `browser` feature".to_string(),
            )),
        }
    }

    /// The store workers write into
    pub fn store(&self) -> Arc<ResultStore> {
        self.store.clone()
    }

    /// Live counters, readable while the run is in progress
    pub fn progress(&self) -> Arc<CrawlProgress> {
        self.progress.clone()
    }

    /// Cancelling this token stops every worker before its next target
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The days a run with the current configuration will visit
    ///
    /// The reference date is the configured one, or today in local time.
    pub fn plan(&self) -> Result<DateRange, ConfigError> {
        let reference = self
            .config
            .crawler
            .reference_date
            .unwrap_or_else(|| Local::now().date_naive());
        DateRange::new(
            reference,
            self.config.crawler.years_back,
            self.config.crawler.order,
        )
    }

    /// Crawls every planned day
    pub async fn run(self) -> Result<CrawlOutcome, ArchiverError> {
        let days = self.plan()?;
        self.run_days(days).await
    }

    /// Crawls the given days with the configured worker pool
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - The run finished or was cancelled; per-day and
    ///   per-article failures are in the report, never in the error
    /// * `Err(ArchiverError)` - A browsing context could not be created
    pub async fn run_days<I>(self, days: I) -> Result<CrawlOutcome, ArchiverError>
    where
        I: ExactSizeIterator<Item = NaiveDate> + Send + 'static,
    {
        let start = Instant::now();
        let days_total = days.len();
        self.progress.set_days_total(days_total as u64);

        let worker_count = (self.config.crawler.worker_count as usize)
            .min(days_total)
            .max(1);

        tracing::info!(
            "Starting crawl of {} days with {} workers (delay {}s)",
            days_total,
            worker_count,
            self.config.crawler.delay_seconds
        );

        // Contexts are opened up front so a broken browser fails the run
        // before any day is claimed.
        let mut fetchers = Vec::with_capacity(worker_count);
        for worker in 0..worker_count {
            let renderer = self.factory.new_context(worker).await?;
            fetchers.push(PageFetcher::new(renderer, self.policy, worker));
        }

        let shared = Arc::new(WorkerShared {
            days: DayQueue::new(days),
            template: self.template.clone(),
            index_parser: self.index_parser.clone(),
            article_parser: self.article_parser.clone(),
            store: self.store.clone(),
            progress: self.progress.clone(),
            cancel: self.cancel.clone(),
            failures: Mutex::new(Vec::new()),
            delay_seconds: self.config.crawler.delay_seconds,
        });

        let mut workers = JoinSet::new();
        for (worker, fetcher) in fetchers.into_iter().enumerate() {
            let shared = shared.clone();
            workers.spawn(async move { shared.run_worker(worker, fetcher).await });
        }

        let mut aborted_workers = 0;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker ended abnormally: {}", e);
                aborted_workers += 1;
            }
        }

        let failures = std::mem::take(
            &mut *shared
                .failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        let report = CrawlReport {
            progress: self.progress.snapshot(),
            failures,
            cancelled: self.cancel.is_cancelled(),
            elapsed: start.elapsed(),
            aborted_workers,
        };

        tracing::info!(
            "Crawl {}: {} articles from {}/{} days, {} failures in {:?}",
            if report.cancelled { "cancelled" } else { "completed" },
            report.progress.articles_collected,
            report.progress.days_processed,
            report.progress.days_total,
            report.progress.failures_so_far(),
            report.elapsed
        );

        Ok(CrawlOutcome {
            store: self.store,
            report,
        })
    }
}

/// State every worker of a run shares
struct WorkerShared {
    days: DayQueue,
    template: Arc<IndexUrlTemplate>,
    index_parser: Arc<IndexParser>,
    article_parser: Arc<ArticleParser>,
    store: Arc<ResultStore>,
    progress: Arc<CrawlProgress>,
    cancel: CancellationToken,
    failures: Mutex<Vec<FetchFailure>>,
    delay_seconds: f64,
}

impl WorkerShared {
    /// Claims and crawls days until none are left or the run is cancelled
    async fn run_worker(&self, worker: usize, mut fetcher: PageFetcher) {
        let mut pacer = Pacer::from_secs_f64(self.delay_seconds);
        tracing::debug!(worker, "Worker started");

        while !self.cancel.is_cancelled() {
            let Some(day) = self.days.next_day() else {
                break;
            };
            self.crawl_day(worker, day, &mut fetcher, &mut pacer).await;
        }

        tracing::debug!(worker, "Worker finished");
    }

    async fn crawl_day(
        &self,
        worker: usize,
        day: NaiveDate,
        fetcher: &mut PageFetcher,
        pacer: &mut Pacer,
    ) {
        let index_url = self.template.build(day);

        if !self.pace(pacer).await {
            return;
        }
        let fetched = fetcher.fetch(FetchTarget::index(&index_url, day)).await;
        pacer.complete();

        let page = match fetched {
            Ok(page) => page,
            Err(failure) => {
                tracing::warn!(
                    worker,
                    "Index for {} failed after {} attempt(s): {}",
                    day,
                    failure.attempts,
                    failure.error
                );
                self.progress.record_day_failed(failure.error.kind());
                self.record_failure(failure);
                return;
            }
        };

        let entries = self.index_parser.parse_index(&page.content, &index_url);
        tracing::debug!(worker, "Found {} article links for {}", entries.len(), day);

        let mut collected = 0usize;
        for entry in entries {
            if self.cancel.is_cancelled() || !self.pace(pacer).await {
                tracing::info!(worker, "Stopping mid-day at {}", day);
                return;
            }
            if self.crawl_article(worker, entry, &index_url, fetcher).await {
                collected += 1;
            }
            pacer.complete();
        }

        self.progress.record_day_processed();
        tracing::info!(worker, "Processed {}: {} articles", day, collected);
    }

    /// Fetches, parses and stores one article; returns whether it was stored
    async fn crawl_article(
        &self,
        worker: usize,
        entry: IndexEntry,
        index_url: &str,
        fetcher: &mut PageFetcher,
    ) -> bool {
        match fetcher
            .fetch(FetchTarget::article(&entry.url, index_url))
            .await
        {
            Ok(page) => {
                let mut record = self.article_parser.parse_article(&page.content, &entry.url);
                record.source_url = Some(index_url.to_string());
                if record.title.is_none() {
                    record.title = entry.title;
                }
                self.store.upsert(record);
                self.progress.record_article();
                true
            }
            Err(failure) => {
                tracing::warn!(
                    worker,
                    "Article {} failed after {} attempt(s): {}",
                    failure.target.url,
                    failure.attempts,
                    failure.error
                );
                self.progress.record_article_failed(failure.error.kind());
                self.record_failure(failure);
                false
            }
        }
    }

    /// Waits out the per-worker delay; false if cancelled while waiting
    async fn pace(&self, pacer: &Pacer) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = pacer.ready() => true,
        }
    }

    fn record_failure(&self, failure: FetchFailure) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::PageRenderer;
    use crate::{FetchError, FetchErrorKind};
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    const DAY_ONE: &str = "https://newsday.co.tt/2020/01/05/";
    const DAY_TWO: &str = "https://newsday.co.tt/2020/01/04/";
    const STORY_A: &str = "https://newsday.co.tt/2020/01/05/fishermen-rescued-off-coast/";
    const STORY_B: &str = "https://newsday.co.tt/2020/01/05/schools-reopen-on-monday/";

    type Script = HashMap<String, VecDeque<Result<String, FetchError>>>;

    /// Fake site shared by every context; unknown URLs are 404s
    ///
    /// Each URL replays its scripted responses in order and then keeps
    /// returning the last one.
    #[derive(Clone, Default)]
    struct MockSite {
        script: Arc<Mutex<Script>>,
        visits: Arc<Mutex<Vec<String>>>,
        cancel_on: Option<(String, CancellationToken)>,
    }

    impl MockSite {
        fn serve(self, url: &str, responses: Vec<Result<String, FetchError>>) -> Self {
            self.script
                .lock()
                .unwrap()
                .insert(url.to_string(), responses.into());
            self
        }

        fn visits(&self) -> Vec<String> {
            self.visits.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageRenderer for MockSite {
        async fn render(&mut self, url: &str) -> Result<String, FetchError> {
            self.visits.lock().unwrap().push(url.to_string());
            if let Some((trigger, token)) = &self.cancel_on {
                if trigger == url {
                    token.cancel();
                }
            }
            let mut script = self.script.lock().unwrap();
            match script.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some(queue) => queue.front().cloned().unwrap(),
                None => Err(FetchError::Http { status: 404 }),
            }
        }
    }

    #[async_trait]
    impl ContextFactory for MockSite {
        async fn new_context(&self, _worker: usize) -> Result<Box<dyn PageRenderer>, ArchiverError> {
            Ok(Box::new(self.clone()))
        }
    }

    struct BrokenBrowser;

    #[async_trait]
    impl ContextFactory for BrokenBrowser {
        async fn new_context(&self, worker: usize) -> Result<Box<dyn PageRenderer>, ArchiverError> {
            Err(ArchiverError::Browser {
                worker,
                message: "executable not found".to_string(),
            })
        }
    }

    fn test_config(workers: u32) -> Config {
        let mut config = Config::default();
        config.crawler.worker_count = workers;
        config.crawler.delay_seconds = 0.0;
        config.crawler.retry_base_delay_ms = 1;
        config
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
    }

    fn index_page() -> String {
        format!(
            r#"<html><body>
                <a href="{}">Fishermen rescued off the coast</a>
                <a href="/2020/01/05/schools-reopen-on-monday/">Schools reopen on Monday</a>
                <a href="/contact/">Contact the newsroom</a>
            </body></html>"#,
            STORY_A
        )
    }

    fn article_page(title: &str) -> String {
        format!(
            r#"<html><body>
                <h1>{}</h1>
                <span class="byline">By Staff Reporter</span>
                <time datetime="2020-01-05T10:00:00-04:00"></time>
                <div class="entry-content"><p>Body text.</p></div>
            </body></html>"#,
            title
        )
    }

    fn two_day_site() -> MockSite {
        MockSite::default()
            .serve(DAY_ONE, vec![Ok(index_page())])
            .serve(DAY_TWO, vec![Err(FetchError::Http { status: 404 })])
            .serve(STORY_A, vec![Ok(article_page("Fishermen rescued"))])
            .serve(STORY_B, vec![Ok(article_page("Schools reopen"))])
    }

    async fn run(site: MockSite, workers: u32, days: Vec<NaiveDate>) -> CrawlOutcome {
        let coordinator = Coordinator::new(test_config(workers), Arc::new(site)).unwrap();
        coordinator.run_days(days.into_iter()).await.unwrap()
    }

    #[tokio::test]
    async fn test_two_days_one_failed_index() {
        let outcome = run(two_day_site(), 1, vec![day(5), day(4)]).await;

        assert_eq!(outcome.store.len(), 2);
        assert_eq!(outcome.report.progress.days_total, 2);
        assert_eq!(outcome.report.progress.days_processed, 2);
        assert_eq!(outcome.report.progress.days_failed, 1);
        assert_eq!(outcome.report.progress.articles_collected, 2);
        assert_eq!(outcome.report.failures.len(), 1);
        assert!(outcome.report.failures[0].target.is_index());
        assert_eq!(
            outcome.report.progress.failures_by_kind.get(&FetchErrorKind::ClientError),
            Some(&1)
        );
        assert!(!outcome.report.cancelled);

        let record = outcome.store.get(STORY_A).unwrap();
        assert_eq!(record.title.as_deref(), Some("Fishermen rescued"));
        assert_eq!(record.author.as_deref(), Some("Staff Reporter"));
        assert_eq!(record.source_url.as_deref(), Some(DAY_ONE));
    }

    #[tokio::test]
    async fn test_single_worker_keeps_assignment_order() {
        let site = two_day_site();
        run(site.clone(), 1, vec![day(5), day(4)]).await;

        assert_eq!(site.visits(), vec![DAY_ONE, STORY_A, STORY_B, DAY_TWO]);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let site = two_day_site().serve(
            STORY_B,
            vec![
                Err(FetchError::Timeout),
                Err(FetchError::Render("body not ready".into())),
                Ok(article_page("Schools reopen")),
            ],
        );
        let outcome = run(site.clone(), 1, vec![day(5)]).await;

        assert_eq!(outcome.store.len(), 2);
        assert!(outcome.report.failures.is_empty());
        let story_b_visits = site.visits().iter().filter(|u| *u == STORY_B).count();
        assert_eq!(story_b_visits, 3);
    }

    #[tokio::test]
    async fn test_article_failure_does_not_abort_day() {
        let site = two_day_site().serve(STORY_A, vec![Err(FetchError::Http { status: 410 })]);
        let outcome = run(site, 2, vec![day(5)]).await;

        assert_eq!(outcome.store.len(), 1);
        assert!(outcome.store.contains(STORY_B));
        assert_eq!(outcome.report.progress.articles_failed, 1);
        assert_eq!(outcome.report.progress.days_failed, 0);
        assert_eq!(outcome.report.progress.days_processed, 1);
    }

    #[tokio::test]
    async fn test_missing_title_uses_link_text() {
        let site = two_day_site().serve(STORY_B, vec![Ok("<html><body></body></html>".into())]);
        let outcome = run(site, 1, vec![day(5)]).await;

        let record = outcome.store.get(STORY_B).unwrap();
        assert_eq!(record.title.as_deref(), Some("Schools reopen on Monday"));
        assert_eq!(record.content, None);
    }

    #[tokio::test]
    async fn test_runs_are_deterministic() {
        let first = run(two_day_site(), 2, vec![day(5), day(4)]).await;
        let second = run(two_day_site(), 2, vec![day(5), day(4)]).await;

        let strip = |outcome: &CrawlOutcome| {
            outcome
                .store
                .export()
                .into_iter()
                .map(|mut r| {
                    r.crawl_date = chrono::DateTime::<chrono::Utc>::MIN_UTC;
                    r
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(strip(&first), strip(&second));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_fetches_nothing() {
        let site = two_day_site();
        let coordinator = Coordinator::new(test_config(2), Arc::new(site.clone())).unwrap();
        coordinator.cancellation_token().cancel();

        let outcome = coordinator
            .run_days(vec![day(5), day(4)].into_iter())
            .await
            .unwrap();

        assert!(outcome.report.cancelled);
        assert!(outcome.store.is_empty());
        assert!(site.visits().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_lets_in_flight_fetch_finish() {
        let coordinator =
            Coordinator::new(test_config(1), Arc::new(MockSite::default())).unwrap();
        let token = coordinator.cancellation_token();
        let site = MockSite {
            cancel_on: Some((STORY_A.to_string(), token)),
            ..two_day_site()
        };
        let coordinator = Coordinator {
            factory: Arc::new(site.clone()),
            ..coordinator
        };

        let outcome = coordinator
            .run_days(vec![day(5), day(4)].into_iter())
            .await
            .unwrap();

        assert!(outcome.report.cancelled);
        assert_eq!(outcome.store.len(), 1);
        assert!(outcome.store.contains(STORY_A));
        assert_eq!(site.visits(), vec![DAY_ONE, STORY_A]);
        assert_eq!(outcome.report.progress.days_processed, 0);
    }

    #[tokio::test]
    async fn test_context_failure_is_fatal() {
        let coordinator = Coordinator::new(test_config(2), Arc::new(BrokenBrowser)).unwrap();
        let result = coordinator.run_days(vec![day(5)].into_iter()).await;
        assert!(matches!(result, Err(ArchiverError::Browser { worker: 0, .. })));
    }

    /// Site whose every page takes a while to render; tracks overlap
    #[derive(Clone, Default)]
    struct SlowSite {
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        contexts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PageRenderer for SlowSite {
        async fn render(&mut self, _url: &str) -> Result<String, FetchError> {
            let now = self.in_flight.fetch_add(1, AtomicOrdering::SeqCst) + 1;
            self.peak.fetch_max(now, AtomicOrdering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, AtomicOrdering::SeqCst);
            Ok("<html><body><main>No stories today</main></body></html>".to_string())
        }
    }

    #[async_trait]
    impl ContextFactory for SlowSite {
        async fn new_context(&self, _worker: usize) -> Result<Box<dyn PageRenderer>, ArchiverError> {
            self.contexts.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(Box::new(self.clone()))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_pool_is_bounded() {
        let site = SlowSite::default();
        let days: Vec<NaiveDate> = (1..=10).map(day).collect();

        let coordinator = Coordinator::new(test_config(2), Arc::new(site.clone())).unwrap();
        let outcome = coordinator.run_days(days.into_iter()).await.unwrap();

        assert_eq!(outcome.report.progress.days_processed, 10);
        assert_eq!(outcome.report.progress.days_failed, 0);
        assert_eq!(site.contexts.load(AtomicOrdering::SeqCst), 2);
        let peak = site.peak.load(AtomicOrdering::SeqCst);
        assert!(peak <= 2, "{} renders overlapped", peak);
        assert!(peak >= 1);
    }

    #[test]
    fn test_http_is_the_default_renderer() {
        assert!(Coordinator::with_browser(test_config(1)).is_ok());
    }

    #[cfg(not(feature = "browser"))]
    #[test]
    fn test_chrome_renderer_unavailable_without_feature() {
        let mut config = test_config(1);
        config.crawler.renderer = RendererKind::Chrome;
        assert!(matches!(
            Coordinator::with_browser(config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected_before_run() {
        let mut config = test_config(1);
        config.site.index_path = "{year}/{month}/".to_string();
        assert!(Coordinator::new(config, Arc::new(MockSite::default())).is_err());
    }

    #[test]
    fn test_plan_uses_reference_date() {
        let mut config = test_config(1);
        config.crawler.years_back = 1;
        config.crawler.reference_date = Some(day(5));
        let coordinator = Coordinator::new(config, Arc::new(MockSite::default())).unwrap();

        let plan = coordinator.plan().unwrap();
        assert_eq!(plan.len(), 366);
        assert_eq!(plan.newest(), day(5));
    }
}

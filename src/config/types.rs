use chrono::NaiveDate;
use serde::Deserialize;

/// Default desktop browser user agent presented to the site
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Main configuration structure for the archiver
///
/// Every section and key is optional; `Config::default()` describes a full
/// fifteen-year crawl of newsday.co.tt with two workers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Direction in which calendar days are visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrawlOrder {
    /// Most recent day first
    #[default]
    NewestFirst,
    /// Oldest day first
    OldestFirst,
}

/// Kind of browsing context each worker opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RendererKind {
    /// Plain HTTP fetches; no JavaScript runs
    #[default]
    Http,
    /// A headless Chrome instance per worker (needs the `browser` feature)
    Chrome,
}

impl RendererKind {
    /// Parses a renderer name as written on the command line
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "http" => Some(Self::Http),
            "chrome" | "chromium" => Some(Self::Chrome),
            _ => None,
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of years of archive to visit, counted back from the reference date
    #[serde(rename = "years-back")]
    pub years_back: u32,

    /// Number of concurrent workers, each with its own browsing context
    #[serde(rename = "worker-count")]
    pub worker_count: u32,

    /// Pause each worker takes before issuing its next fetch (seconds)
    #[serde(rename = "delay-seconds")]
    pub delay_seconds: f64,

    /// Backoff base between retry attempts (milliseconds)
    #[serde(rename = "retry-base-delay-ms")]
    pub retry_base_delay_ms: u64,

    /// Per-navigation timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    pub order: CrawlOrder,

    /// Browsing context implementation
    pub renderer: RendererKind,

    /// Forwarded to the browsing context factory
    pub headless: bool,

    /// Day the range ends on; today when absent
    #[serde(rename = "reference-date")]
    pub reference_date: Option<NaiveDate>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            years_back: 15,
            worker_count: 2,
            delay_seconds: 0.5,
            retry_base_delay_ms: 500,
            request_timeout_secs: 30,
            order: CrawlOrder::NewestFirst,
            renderer: RendererKind::Http,
            headless: true,
            reference_date: None,
        }
    }
}

/// Target site layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Root of the site, e.g. `https://newsday.co.tt`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Archive-index path relative to `base-url`, with `{year}`, `{month}`
    /// and `{day}` placeholders
    #[serde(rename = "index-path")]
    pub index_path: String,

    /// Regular expressions; a link is an article link if any of them matches
    #[serde(rename = "article-patterns")]
    pub article_patterns: Vec<String>,

    /// Minimum anchor text length for a link to count as an article link
    #[serde(rename = "min-link-text")]
    pub min_link_text: usize,

    /// Selector that must be present before a page counts as rendered
    #[serde(rename = "ready-selector")]
    pub ready_selector: String,

    /// Only follow article links on the site's own host
    #[serde(rename = "same-host-only")]
    pub same_host_only: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://newsday.co.tt".to_string(),
            index_path: "{year}/{month}/{day}/".to_string(),
            article_patterns: [
                r"/\d{4}/\d{2}/\d{2}/.+",
                "/news/",
                "/sports/",
                "/features/",
                "/editorial/",
                "/entertainment/",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            min_link_text: 11,
            ready_selector: "main, article, #content, .entry-content".to_string(),
            same_host_only: true,
        }
    }
}

/// Ordered fallback selectors for each extracted article field
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub title: Vec<String>,
    pub content: Vec<String>,
    pub author: Vec<String>,
    pub date: Vec<String>,
    pub category: Vec<String>,
    pub tags: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            title: strings(&[
                "h1",
                ".headline",
                ".title",
                "[class*=\"title\"]",
                "[class*=\"headline\"]",
            ]),
            content: strings(&[
                ".article-content",
                ".entry-content",
                ".post-content",
                "[class*=\"content\"]",
                ".story-body",
                "article",
            ]),
            author: strings(&[
                ".author",
                ".byline",
                "[class*=\"author\"]",
                "[class*=\"byline\"]",
            ]),
            date: strings(&[".date", ".published", "[class*=\"date\"]", "time"]),
            category: strings(&[".category", ".section", "[class*=\"category\"]"]),
            tags: strings(&[".tags a", ".post-tags a", "a[rel~=\"tag\"]"]),
        }
    }
}

/// User agent presented by every browsing context
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    pub value: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            value: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the export files are written to
    pub directory: String,

    /// File name prefix; a timestamp and extension are appended
    #[serde(rename = "file-prefix")]
    pub file_prefix: String,

    /// Export formats: `json`, `jsonl`, `sqlite`
    pub formats: Vec<String>,

    /// Optional path of the markdown run summary
    #[serde(rename = "summary-path")]
    pub summary_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            file_prefix: "newsday_articles".to_string(),
            formats: strings(&["json", "sqlite"]),
            summary_path: None,
        }
    }
}

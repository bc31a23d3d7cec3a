//! HTML parsers for archive-index pages and article pages
//!
//! Both parsers are infallible at run time: selectors and patterns are
//! compiled when the parser is built, and a page that lacks something simply
//! yields fewer links or emptier fields.

use crate::config::{SelectorConfig, SiteConfig};
use crate::store::ArticleRecord;
use crate::url::{normalize_url, same_host};
use crate::ConfigError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Longest tag kept, in characters
const MAX_TAG_LEN: usize = 64;

/// Day formats tried, in order, on free-text dates
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%A, %B %d, %Y",
    "%d %B %Y",
    "%A %d %B %Y",
    "%A, %d %B %Y",
    "%d %b %Y",
];

/// Datetime formats without an offset
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// A candidate article link found on an archive-index page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Normalized absolute article URL
    pub url: String,
    /// Anchor text, used as a title hint
    pub title: Option<String>,
}

/// Extracts article links from archive-index pages
#[derive(Debug, Clone)]
pub struct IndexParser {
    site: Url,
    patterns: Vec<Regex>,
    min_link_text: usize,
    same_host_only: bool,
    anchors: Selector,
}

impl IndexParser {
    pub fn new(site: &SiteConfig) -> Result<Self, ConfigError> {
        let site_url = Url::parse(&site.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("base-url '{}': {}", site.base_url, e)))?;

        let patterns = site
            .article_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", p, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            site: site_url,
            patterns,
            min_link_text: site.min_link_text,
            same_host_only: site.same_host_only,
            anchors: compile("a[href]")?,
        })
    }

    /// Returns the article links on an index page, in document order
    ///
    /// # Link Rules
    ///
    /// **Include** `<a href>` whose resolved URL path matches an article
    /// pattern and whose text is at least `min-link-text` characters long.
    ///
    /// **Exclude** `javascript:`, `mailto:`, `tel:` and `data:` links,
    /// fragment-only links, `download` links, links back to the index page
    /// itself and, with `same-host-only`, links to other hosts.
    ///
    /// Duplicate URLs (after normalization) keep their first occurrence.
    /// A page without any qualifying link yields an empty list.
    pub fn parse_index(&self, html: &str, page_url: &str) -> Vec<IndexEntry> {
        let base = Url::parse(page_url).unwrap_or_else(|_| self.site.clone());
        let page_key = normalize_url(base.as_str()).ok();
        let document = Html::parse_document(html);

        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for element in document.select(&self.anchors) {
            if element.value().attr("download").is_some() {
                continue;
            }

            let Some(href) = element.value().attr("href") else {
                continue;
            };

            let Some(resolved) = resolve_link(href, &base) else {
                continue;
            };

            let url = match normalize_url(resolved.as_str()) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!("Skipping link {}: {}", resolved, e);
                    continue;
                }
            };

            if page_key.as_ref() == Some(&url) {
                continue;
            }

            if self.same_host_only && !same_host(&url, &self.site) {
                continue;
            }

            if !self.is_article_path(url.path()) {
                continue;
            }

            let text = collapse_whitespace(element.text());
            if text.chars().count() < self.min_link_text {
                continue;
            }

            if seen.insert(url.to_string()) {
                entries.push(IndexEntry {
                    url: url.into(),
                    title: non_empty(text),
                });
            }
        }

        entries
    }

    fn is_article_path(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(path))
    }
}

/// Extracts structured fields from article pages
#[derive(Debug, Clone)]
pub struct ArticleParser {
    title: Vec<Selector>,
    content: Vec<Selector>,
    author: Vec<Selector>,
    date: Vec<Selector>,
    category: Vec<Selector>,
    tags: Vec<Selector>,
    og_title: Selector,
    published_time: Selector,
    section: Selector,
    meta_tags: Selector,
}

impl ArticleParser {
    pub fn new(selectors: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            title: compile_all(&selectors.title)?,
            content: compile_all(&selectors.content)?,
            author: compile_all(&selectors.author)?,
            date: compile_all(&selectors.date)?,
            category: compile_all(&selectors.category)?,
            tags: compile_all(&selectors.tags)?,
            og_title: compile("meta[property=\"og:title\"]")?,
            published_time: compile("meta[property=\"article:published_time\"]")?,
            section: compile("meta[property=\"article:section\"]")?,
            meta_tags: compile("meta[property=\"article:tag\"]")?,
        })
    }

    /// Extracts an article record; `crawl_date` is the current time
    pub fn parse_article(&self, html: &str, url: &str) -> ArticleRecord {
        self.parse_article_at(html, url, Utc::now())
    }

    /// Extracts an article record with an explicit `crawl_date`
    ///
    /// Each field is extracted independently; a missing field leaves that
    /// field empty and never affects the others.
    pub fn parse_article_at(&self, html: &str, url: &str, crawl_date: DateTime<Utc>) -> ArticleRecord {
        let document = Html::parse_document(html);
        let mut record = ArticleRecord::new(url, crawl_date);

        record.title =
            first_text(&document, &self.title).or_else(|| meta_content(&document, &self.og_title));
        record.content = self.extract_content(&document);
        record.author = first_text(&document, &self.author).map(strip_byline);
        record.date = self.extract_date(&document);
        record.category =
            first_text(&document, &self.category).or_else(|| meta_content(&document, &self.section));
        record.tags = self.extract_tags(&document);

        record
    }

    fn extract_content(&self, document: &Html) -> Option<String> {
        self.content
            .iter()
            .filter_map(|selector| document.select(selector).next())
            .map(body_text)
            .find(|text| !text.is_empty())
    }

    fn extract_date(&self, document: &Html) -> Option<String> {
        let machine_readable = self.date.iter().find_map(|selector| {
            document
                .select(selector)
                .find_map(|el| el.value().attr("datetime").and_then(|v| non_empty(v.trim().to_string())))
        });

        machine_readable
            .or_else(|| meta_content(document, &self.published_time))
            .or_else(|| first_text(document, &self.date))
            .map(|raw| normalize_date(&raw))
    }

    fn extract_tags(&self, document: &Html) -> Vec<String> {
        let from_links = self
            .tags
            .iter()
            .flat_map(|selector| document.select(selector))
            .map(|el| collapse_whitespace(el.text()));
        let from_meta = document
            .select(&self.meta_tags)
            .filter_map(|el| el.value().attr("content"))
            .map(|v| collapse_whitespace(std::iter::once(v)));

        let mut seen = HashSet::new();
        from_links
            .chain(from_meta)
            .filter(|tag| !tag.is_empty() && tag.chars().count() <= MAX_TAG_LEN)
            .filter(|tag| seen.insert(tag.to_lowercase()))
            .collect()
    }
}

/// Normalizes a publication date for sorting
///
/// RFC 3339 timestamps are kept (re-serialized); other recognized formats
/// become `YYYY-MM-DD`; anything else is returned trimmed but unchanged.
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    let cleaned = trimmed
        .trim_start_matches("Published:")
        .trim_start_matches("Published")
        .trim_start_matches("Updated:")
        .trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(cleaned) {
        return dt.to_rfc3339();
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, format) {
            return dt.date().format("%Y-%m-%d").to_string();
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(cleaned, format) {
            return date.format("%Y-%m-%d").to_string();
        }
    }

    trimmed.to_string()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute)
        }
        _ => None,
    }
}

/// Text of the first element matched by any selector, in selector order
fn first_text(document: &Html, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        document
            .select(selector)
            .map(|el| collapse_whitespace(el.text()))
            .find(|text| !text.is_empty())
    })
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|el| el.value().attr("content"))
        .map(|v| collapse_whitespace(std::iter::once(v)))
        .find(|v| !v.is_empty())
}

/// Multi-line body text with script and style subtrees removed
///
/// One trimmed, non-empty text node per line.
fn body_text(element: ElementRef) -> String {
    let root = element.id();
    let mut lines = Vec::new();

    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != root)
            .chain(std::iter::once(*element))
            .filter_map(|ancestor| ancestor.value().as_element())
            .any(|el| matches!(el.name(), "script" | "style" | "noscript"));
        if hidden {
            continue;
        }

        let line = text.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }

    lines.join("\n")
}

/// Joins text fragments and collapses whitespace runs to single spaces
fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    let joined: String = parts.collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_byline(author: String) -> String {
    match author.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("by ") => author[3..].trim().to_string(),
        _ => author,
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

fn compile_all(selectors: &[String]) -> Result<Vec<Selector>, ConfigError> {
    selectors.iter().map(|s| compile(s)).collect()
}

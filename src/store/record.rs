use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One extracted article
///
/// Only `url` and `crawl_date` are guaranteed; every other field is
/// best-effort and may be absent when the page did not carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    /// Publication date: RFC 3339, `YYYY-MM-DD`, or the page's own text
    pub date: Option<String>,
    pub category: Option<String>,
    /// Normalized article URL; unique within a store
    pub url: String,
    /// Wall-clock time of extraction, never taken from page content
    pub crawl_date: DateTime<Utc>,
    /// Archive-index page the article was linked from
    pub source_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ArticleRecord {
    /// A record with only the guaranteed fields populated
    pub fn new(url: impl Into<String>, crawl_date: DateTime<Utc>) -> Self {
        Self {
            title: None,
            content: None,
            author: None,
            date: None,
            category: None,
            url: url.into(),
            crawl_date,
            source_url: None,
            tags: Vec::new(),
        }
    }
}

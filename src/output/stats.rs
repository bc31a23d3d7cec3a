//! Statistics over a finished crawl
//!
//! This module condenses the exported records and the run report into the
//! figures printed at the end of a CLI run.

use crate::crawler::CrawlReport;
use crate::store::ArticleRecord;
use std::collections::HashMap;

/// Categories listed by [`print_statistics`]
const TOP_CATEGORIES: usize = 10;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlStatistics {
    /// Records in the export
    pub total_articles: u64,

    /// Records that carry each field
    pub with_title: u64,
    pub with_author: u64,
    pub with_date: u64,
    pub with_content: u64,

    /// Earliest and latest publication day seen (`YYYY-MM-DD`)
    pub earliest_date: Option<String>,
    pub latest_date: Option<String>,

    /// Article count per category, most common first
    pub categories: Vec<(String, u64)>,

    /// Days visited and days whose index failed
    pub days_processed: u64,
    pub days_failed: u64,

    /// Failed targets of every kind
    pub total_failures: u64,
}

impl CrawlStatistics {
    /// Computes statistics from the export and the run report
    pub fn collect(records: &[ArticleRecord], report: &CrawlReport) -> Self {
        let count = |f: fn(&ArticleRecord) -> bool| records.iter().filter(|r| f(r)).count() as u64;

        let mut days: Vec<&str> = records
            .iter()
            .filter_map(|r| r.date.as_deref())
            .filter_map(calendar_day)
            .collect();
        days.sort_unstable();

        let mut by_category: HashMap<&str, u64> = HashMap::new();
        for category in records.iter().filter_map(|r| r.category.as_deref()) {
            *by_category.entry(category).or_insert(0) += 1;
        }
        let mut categories: Vec<(String, u64)> = by_category
            .into_iter()
            .map(|(name, n)| (name.to_string(), n))
            .collect();
        categories.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            total_articles: records.len() as u64,
            with_title: count(|r| r.title.is_some()),
            with_author: count(|r| r.author.is_some()),
            with_date: count(|r| r.date.is_some()),
            with_content: count(|r| r.content.is_some()),
            earliest_date: days.first().map(|d| d.to_string()),
            latest_date: days.last().map(|d| d.to_string()),
            categories,
            days_processed: report.progress.days_processed,
            days_failed: report.progress.days_failed,
            total_failures: report.progress.failures_so_far(),
        }
    }
}

/// `YYYY-MM-DD` prefix of a normalized date, if it has one
fn calendar_day(date: &str) -> Option<&str> {
    let day = date.get(..10)?;
    let bytes = day.as_bytes();
    let shaped = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    shaped.then_some(day)
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Articles collected: {}", stats.total_articles);
    println!(
        "  Days processed: {} ({} failed)",
        stats.days_processed, stats.days_failed
    );
    println!("  Failed targets: {}", stats.total_failures);
    if let (Some(earliest), Some(latest)) = (&stats.earliest_date, &stats.latest_date) {
        println!("  Publication dates: {} to {}", earliest, latest);
    }
    println!();

    println!("Field Coverage:");
    for (name, n) in [
        ("title", stats.with_title),
        ("author", stats.with_author),
        ("date", stats.with_date),
        ("content", stats.with_content),
    ] {
        println!(
            "  {}: {} ({:.1}%)",
            name,
            n,
            percent(n, stats.total_articles)
        );
    }
    println!();

    if !stats.categories.is_empty() {
        println!("Top Categories:");
        for (category, n) in stats.categories.iter().take(TOP_CATEGORIES) {
            println!("  {}: {}", category, n);
        }
        println!();
    }
}

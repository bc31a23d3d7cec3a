//! In-memory result store
//!
//! Workers upsert article records keyed by URL; the output layer reads a
//! deterministically ordered export once the run is over.

mod record;

pub use record::ArticleRecord;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Outcome of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The URL was not present before
    Inserted,
    /// An existing record with the same URL was overwritten
    Replaced,
}

/// Concurrency-safe collection of article records, unique by `url`
///
/// Upserts are atomic with respect to each other: concurrent writers on
/// different keys never lose updates, and two writers racing on the same key
/// leave exactly one record behind (the last writer's).
#[derive(Debug, Default)]
pub struct ResultStore {
    records: RwLock<HashMap<String, ArticleRecord>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `record`, replacing any record with the same URL
    pub fn upsert(&self, record: ArticleRecord) -> Upsert {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match records.insert(record.url.clone(), record) {
            Some(_) => Upsert::Replaced,
            None => Upsert::Inserted,
        }
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, url: &str) -> bool {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(url)
    }

    pub fn get(&self, url: &str) -> Option<ArticleRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }

    /// All records in a stable order
    ///
    /// Records whose date parses come first, newest instant first. Records
    /// with no date, or a date that does not parse, follow. Ties are broken
    /// by URL ascending, so two stores with the same contents always export
    /// identically.
    pub fn export(&self) -> Vec<ArticleRecord> {
        let mut records: Vec<ArticleRecord> = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        records.sort_by_cached_key(|record| {
            let published = published_at(record);
            (published.is_none(), Reverse(published), record.url.clone())
        });
        records
    }
}

/// Publication instant of a record in UTC
///
/// RFC 3339 dates keep their offset; a bare `YYYY-MM-DD` counts as midnight
/// UTC.
fn published_at(record: &ArticleRecord) -> Option<NaiveDateTime> {
    let date = record.date.as_deref()?.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(date) {
        return Some(instant.naive_utc());
    }
    NaiveDate::parse_from_str(date.get(..10)?, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
}

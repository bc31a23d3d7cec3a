use crate::FetchErrorKind;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Run counters shared between workers and progress observers
///
/// Every counter is an independent atomic, so reading a snapshot never
/// blocks a worker. A snapshot taken mid-run is not a consistent cut across
/// counters; each value is individually accurate at the time it was read.
#[derive(Debug, Default)]
pub struct CrawlProgress {
    days_total: AtomicU64,
    days_processed: AtomicU64,
    days_failed: AtomicU64,
    articles_collected: AtomicU64,
    articles_failed: AtomicU64,
    failures_by_kind: [AtomicU64; FetchErrorKind::ALL.len()],
}

/// Point-in-time copy of [`CrawlProgress`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Days in the planned range
    pub days_total: u64,
    /// Days finished, whether or not their index page could be fetched
    pub days_processed: u64,
    /// Days whose index page failed
    pub days_failed: u64,
    /// Article records upserted into the store
    pub articles_collected: u64,
    /// Article pages that failed
    pub articles_failed: u64,
    /// Failed targets grouped by error kind
    pub failures_by_kind: BTreeMap<FetchErrorKind, u64>,
}

impl ProgressSnapshot {
    /// Total number of failed targets, index and article pages combined
    pub fn failures_so_far(&self) -> u64 {
        self.days_failed + self.articles_failed
    }
}

impl CrawlProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_days_total(&self, total: u64) {
        self.days_total.store(total, Ordering::Relaxed);
    }

    pub(crate) fn record_day_processed(&self) {
        self.days_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_day_failed(&self, kind: FetchErrorKind) {
        self.days_failed.fetch_add(1, Ordering::Relaxed);
        self.failures_by_kind[kind.index()].fetch_add(1, Ordering::Relaxed);
        self.record_day_processed();
    }

    pub(crate) fn record_article(&self) {
        self.articles_collected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_article_failed(&self, kind: FetchErrorKind) {
        self.articles_failed.fetch_add(1, Ordering::Relaxed);
        self.failures_by_kind[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Reads every counter without blocking writers
    pub fn snapshot(&self) -> ProgressSnapshot {
        let failures_by_kind = FetchErrorKind::ALL
            .iter()
            .filter_map(|kind| {
                let count = self.failures_by_kind[kind.index()].load(Ordering::Relaxed);
                (count > 0).then_some((*kind, count))
            })
            .collect();

        ProgressSnapshot {
            days_total: self.days_total.load(Ordering::Relaxed),
            days_processed: self.days_processed.load(Ordering::Relaxed),
            days_failed: self.days_failed.load(Ordering::Relaxed),
            articles_collected: self.articles_collected.load(Ordering::Relaxed),
            articles_failed: self.articles_failed.load(Ordering::Relaxed),
            failures_by_kind,
        }
    }
}

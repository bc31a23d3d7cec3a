//! Work distribution and pacing for crawl workers
//!
//! This module handles:
//! - Handing out calendar days to workers, each day exactly once
//! - Enforcing the configured delay between consecutive fetches of a worker

use chrono::NaiveDate;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Shared queue of days still to be crawled
///
/// Days are pulled lazily from the underlying iterator, so a multi-decade
/// range is never materialized. Every day is handed to exactly one worker.
pub struct DayQueue {
    days: Mutex<Box<dyn Iterator<Item = NaiveDate> + Send>>,
}

impl DayQueue {
    /// Creates a queue over `days`, handed out in iteration order
    pub fn new<I>(days: I) -> Self
    where
        I: Iterator<Item = NaiveDate> + Send + 'static,
    {
        Self {
            days: Mutex::new(Box::new(days)),
        }
    }

    /// Takes the next unclaimed day, or None once the range is exhausted
    pub fn next_day(&self) -> Option<NaiveDate> {
        self.days
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next()
    }
}

/// Per-worker politeness delay
///
/// A worker calls [`Pacer::ready`] before each fetch and [`Pacer::complete`]
/// after it. The first fetch never waits.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    last_done: Option<Instant>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_done: None,
        }
    }

    /// Builds a pacer from a delay in seconds
    ///
    /// Negative or NaN means no delay; values too large for a `Duration`
    /// saturate.
    pub fn from_secs_f64(seconds: f64) -> Self {
        let delay = if seconds > 0.0 {
            Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        Self::new(delay)
    }

    /// Time left before the next fetch may start
    pub fn time_until_ready(&self, now: Instant) -> Duration {
        match self.last_done {
            Some(done) => match done.checked_add(self.delay) {
                Some(ready_at) => ready_at.saturating_duration_since(now),
                None => self.delay,
            },
            None => Duration::ZERO,
        }
    }

    /// Waits until the delay since the previous fetch has elapsed
    pub async fn ready(&self) {
        let wait = self.time_until_ready(Instant::now());
        if !wait.is_zero() {
            tracing::trace!("Pacing for {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Marks the end of a fetch
    pub fn complete(&mut self) {
        self.last_done = Some(Instant::now());
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

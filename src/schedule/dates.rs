use crate::config::CrawlOrder;
use crate::ConfigError;
use chrono::{Days, NaiveDate};

/// Number of days covered by `years_back` years, i.e. `floor(years_back * 365.25)`
pub fn span_days(years_back: u32) -> u64 {
    u64::from(years_back) * 1461 / 4
}

/// A bounded, lazy sequence of calendar days
///
/// Covers every day from `reference - span_days(years_back)` through
/// `reference`, inclusive. Days are computed on demand from an offset, so
/// the range never materializes more than one date at a time.
#[derive(Debug, Clone)]
pub struct DateRange {
    reference: NaiveDate,
    oldest: NaiveDate,
    order: CrawlOrder,
    /// Next offset handed out from the front
    front: u64,
    /// One past the last offset handed out from the back
    back: u64,
}

impl DateRange {
    /// Creates the range ending on `reference`
    ///
    /// # Returns
    ///
    /// * `Ok(DateRange)` - The range of `span_days(years_back) + 1` days
    /// * `Err(ConfigError)` - The start of the range falls outside the calendar
    pub fn new(
        reference: NaiveDate,
        years_back: u32,
        order: CrawlOrder,
    ) -> Result<Self, ConfigError> {
        let span = span_days(years_back);
        let oldest = reference.checked_sub_days(Days::new(span)).ok_or_else(|| {
            ConfigError::Validation(format!(
                "years-back {} reaches before the supported calendar from {}",
                years_back, reference
            ))
        })?;

        Ok(Self {
            reference,
            oldest,
            order,
            front: 0,
            back: span + 1,
        })
    }

    /// Most recent day in the range
    pub fn newest(&self) -> NaiveDate {
        self.reference
    }

    /// Earliest day in the range
    pub fn oldest(&self) -> NaiveDate {
        self.oldest
    }

    fn day_at(&self, offset: u64) -> Option<NaiveDate> {
        match self.order {
            CrawlOrder::NewestFirst => self.reference.checked_sub_days(Days::new(offset)),
            CrawlOrder::OldestFirst => self.oldest.checked_add_days(Days::new(offset)),
        }
    }
}

/// Days from `reference` back `years_back` years, most recent first
pub fn generate(reference: NaiveDate, years_back: u32) -> Result<DateRange, ConfigError> {
    DateRange::new(reference, years_back, CrawlOrder::NewestFirst)
}

impl Iterator for DateRange {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let day = self.day_at(self.front);
        self.front += 1;
        day
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.back - self.front).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for DateRange {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.day_at(self.back)
    }
}

impl ExactSizeIterator for DateRange {}

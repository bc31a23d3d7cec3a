//! Crawl schedule: which days to visit and where their archive pages live
//!
//! - `DateRange`: the lazy, bounded sequence of calendar days
//! - `IndexUrlTemplate`: day → archive-index URL

mod dates;
mod template;

pub use dates::{generate, span_days, DateRange};
pub use template::IndexUrlTemplate;

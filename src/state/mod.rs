//! State module for tracking fetch progress
//!
//! # Components
//!
//! - `TargetState`: lifecycle of one fetch target (pending, fetching, retrying, done)
//! - `CrawlProgress`: lock-free run counters readable while workers write them

mod progress;
mod target_state;

// Re-export main types
pub use progress::{CrawlProgress, ProgressSnapshot};
pub use target_state::TargetState;

//! Retry policy for page fetches
//!
//! The policy is a pure function of the attempt number and the error, so it
//! can be tested without a network or a browser.

use crate::FetchError;
use std::time::Duration;

/// Total attempts per target, including the first
pub const MAX_ATTEMPTS: u32 = 3;

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Wait this long, then try again
    Retry(Duration),
    /// Stop and report the failure
    GiveUp,
}

/// Exponential backoff over a fixed attempt budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration) -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay,
        }
    }

    /// Decides the next step after attempt number `attempt` (1-based) failed
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Terminal error (4xx, malformed URL) | GiveUp |
    /// | Attempt budget used up | GiveUp |
    /// | Transient error (timeout, network, render, 5xx) | Retry(backoff) |
    pub fn next_action(&self, attempt: u32, error: &FetchError) -> RetryAction {
        if !error.is_transient() || attempt >= self.max_attempts {
            RetryAction::GiveUp
        } else {
            RetryAction::Retry(self.backoff(attempt))
        }
    }

    /// `base_delay * 2^(attempt - 1)`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

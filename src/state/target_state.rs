/// Lifecycle of a single fetch target
///
/// ```text
/// Pending → Fetching → Succeeded
///              ↓ ↑
///            Retrying
///              ↓
///            Failed
/// ```
use crate::ArchiverError;
use std::fmt;
use std::time::Duration;

/// Represents the current state of a fetch target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    // ===== Active States =====
    /// Created but not yet navigated to
    Pending,

    /// A navigation is in flight; `attempt` is 1-based
    Fetching { attempt: u32 },

    /// Attempt `attempt` failed transiently; waiting `delay` before the next one
    Retrying { attempt: u32, delay: Duration },

    // ===== Terminal States =====
    /// Content was rendered and handed to the parser
    Succeeded,

    /// Retries exhausted or the error was terminal
    Failed,
}

impl TargetState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: &TargetState) -> bool {
        match (self, next) {
            (Self::Pending, Self::Fetching { attempt }) => *attempt == 1,
            (Self::Fetching { .. }, Self::Succeeded | Self::Failed) => true,
            (Self::Fetching { attempt }, Self::Retrying { attempt: failed, .. }) => {
                attempt == failed
            }
            (Self::Retrying { attempt: failed, .. }, Self::Fetching { attempt }) => {
                *attempt == failed + 1
            }
            _ => false,
        }
    }

    /// Moves to `next`, rejecting illegal transitions
    pub fn transition(self, next: TargetState) -> Result<TargetState, ArchiverError> {
        if self.can_transition_to(&next) {
            Ok(next)
        } else {
            Err(ArchiverError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Short lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching { .. } => "fetching",
            Self::Retrying { .. } => "retrying",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetching { attempt } => write!(f, "fetching (attempt {})", attempt),
            Self::Retrying { attempt, delay } => {
                write!(f, "retrying (after attempt {}, in {:?})", attempt, delay)
            }
            other => f.write_str(other.as_str()),
        }
    }
}

//! Newsday Archiver: a date-keyed news archive crawler
//!
//! This crate walks a publication's per-day archive pages over a span of years,
//! follows each article link, extracts structured article fields and collects
//! them into a single result store that can be exported to disk.

pub mod config;
pub mod crawler;
pub mod output;
pub mod schedule;
pub mod state;
pub mod store;
pub mod url;

use thiserror::Error;

/// Main error type for archiver operations
#[derive(Debug, Error)]
pub enum ArchiverError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Failed to create browsing context for worker {worker}: {message}")]
    Browser { worker: usize, message: String },

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::TargetState,
        to: state::TargetState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
///
/// These are only ever raised while loading the configuration or building the
/// coordinator, before any worker has started.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid index path template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid article pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Errors produced by a single page navigation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,

    #[error("HTTP status {status}")]
    Http { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Page did not finish rendering: {0}")]
    Render(String),

    #[error("Malformed URL: {0}")]
    InvalidUrl(String),
}

/// Coarse classification of fetch errors, used for failure accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FetchErrorKind {
    Timeout,
    ClientError,
    ServerError,
    Network,
    Render,
    InvalidUrl,
}

impl FetchError {
    /// Returns true if another attempt at the same target may succeed
    ///
    /// Timeouts, network failures, render failures and 5xx responses are
    /// transient. 4xx responses and malformed URLs are terminal.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Network(_) | Self::Render(_) => true,
            Self::Http { status } => *status >= 500,
            Self::InvalidUrl(_) => false,
        }
    }

    /// Returns the accounting bucket for this error
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Timeout => FetchErrorKind::Timeout,
            Self::Http { status } if *status >= 500 => FetchErrorKind::ServerError,
            Self::Http { .. } => FetchErrorKind::ClientError,
            Self::Network(_) => FetchErrorKind::Network,
            Self::Render(_) => FetchErrorKind::Render,
            Self::InvalidUrl(_) => FetchErrorKind::InvalidUrl,
        }
    }
}

impl FetchErrorKind {
    /// All kinds, in reporting order
    pub const ALL: [FetchErrorKind; 6] = [
        Self::Timeout,
        Self::ClientError,
        Self::ServerError,
        Self::Network,
        Self::Render,
        Self::InvalidUrl,
    ];

    /// Stable identifier used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ClientError => "http_4xx",
            Self::ServerError => "http_5xx",
            Self::Network => "network",
            Self::Render => "render",
            Self::InvalidUrl => "invalid_url",
        }
    }

    /// Position of this kind in [`FetchErrorKind::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for archiver operations
pub type Result<T> = std::result::Result<T, ArchiverError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlOutcome, CrawlReport};
pub use state::TargetState;
pub use store::{ArticleRecord, ResultStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Timeout.is_transient());
        assert!(FetchError::Network("reset".into()).is_transient());
        assert!(FetchError::Render("no body".into()).is_transient());
        assert!(FetchError::Http { status: 503 }.is_transient());

        assert!(!FetchError::Http { status: 404 }.is_transient());
        assert!(!FetchError::Http { status: 429 }.is_transient());
        assert!(!FetchError::InvalidUrl("::".into()).is_transient());
    }

    #[test]
    fn test_kind_index_matches_all() {
        for (i, kind) in FetchErrorKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
        assert_eq!(
            FetchError::Http { status: 500 }.kind(),
            FetchErrorKind::ServerError
        );
        assert_eq!(
            FetchError::Http { status: 410 }.kind(),
            FetchErrorKind::ClientError
        );
    }
}

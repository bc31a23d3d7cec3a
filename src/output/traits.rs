//! Output handler traits and types
//!
//! This module defines the trait interface for record writers and the
//! formats they produce.

use crate::store::ArticleRecord;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// A single pretty-printed JSON array
    Json,
    /// One JSON object per line
    JsonLines,
    /// An SQLite database with an `articles` table
    Sqlite,
    /// Comma-separated values with a header row
    Csv,
    /// An Excel workbook with one `Articles` worksheet
    Xlsx,
}

impl OutputFormat {
    /// Parses a format name as written in the configuration
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "json-lines" => Some(Self::JsonLines),
            "sqlite" | "db" => Some(Self::Sqlite),
            "csv" => Some(Self::Csv),
            "xlsx" | "excel" => Some(Self::Xlsx),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::JsonLines => "jsonl",
            Self::Sqlite => "db",
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

/// Trait for record writers
///
/// A handler receives the full, already ordered export and writes it to a
/// single file. Writing the same records twice produces identical content.
pub trait OutputHandler {
    /// Writes `records` to `path`, replacing any existing file
    ///
    /// # Arguments
    ///
    /// * `records` - Records in export order
    /// * `path` - Destination file
    fn write(&self, records: &[ArticleRecord], path: &Path) -> OutputResult<()>;
}

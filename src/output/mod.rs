//! Output module for exporting records and reporting on a run
//!
//! This module handles:
//! - Exporting the result set as JSON, JSON Lines, CSV, Excel or SQLite
//! - Generating markdown summaries of crawl results
//! - Printing crawl statistics

mod csv_output;
mod json;
mod markdown;
mod sqlite_output;
pub mod stats;
mod traits;
mod xlsx_output;

pub use csv_output::{CsvOutputHandler, ARTICLE_COLUMNS};
pub use json::{JsonLinesOutputHandler, JsonOutputHandler};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use sqlite_output::{SqliteOutputHandler, ARTICLES_SCHEMA};
pub use stats::{print_statistics, CrawlStatistics};
pub use traits::{OutputError, OutputFormat, OutputHandler, OutputResult};
pub use xlsx_output::XlsxOutputHandler;

use crate::config::OutputConfig;
use crate::store::ArticleRecord;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Returns the writer for `format`
pub fn handler_for(format: OutputFormat) -> Box<dyn OutputHandler> {
    match format {
        OutputFormat::Json => Box::new(JsonOutputHandler),
        OutputFormat::JsonLines => Box::new(JsonLinesOutputHandler),
        OutputFormat::Sqlite => Box::new(SqliteOutputHandler),
        OutputFormat::Csv => Box::new(CsvOutputHandler),
        OutputFormat::Xlsx => Box::new(XlsxOutputHandler),
    }
}

/// File name for one export: `{prefix}_{YYYYmmdd_HHMMSS}.{ext}`
pub fn output_file_name(prefix: &str, format: OutputFormat, timestamp: DateTime<Utc>) -> String {
    format!(
        "{}_{}.{}",
        prefix,
        timestamp.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Writes `records` in every configured format
///
/// The output directory is created if needed. Duplicate format names are
/// written once.
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - The files written, in configuration order
/// * `Err(OutputError)` - A format name was unknown or a write failed
pub fn write_outputs(
    records: &[ArticleRecord],
    config: &OutputConfig,
    timestamp: DateTime<Utc>,
) -> OutputResult<Vec<PathBuf>> {
    let directory = PathBuf::from(&config.directory);
    std::fs::create_dir_all(&directory)?;

    let mut formats = Vec::new();
    for name in &config.formats {
        let format = OutputFormat::parse(name)
            .ok_or_else(|| OutputError::Format(format!("Unknown output format '{}'", name)))?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }

    let mut written = Vec::with_capacity(formats.len());
    for format in formats {
        let path = directory.join(output_file_name(&config.file_prefix, format, timestamp));
        handler_for(format)
            .write(records, &path)
            .map_err(|e| OutputError::Write(format!("{}: {}", path.display(), e)))?;
        tracing::info!("Wrote {} articles to {}", records.len(), path.display());
        written.push(path);
    }

    Ok(written)
}

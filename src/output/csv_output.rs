//! CSV record writer
//!
//! One row per record with a header row. Columns follow the field order of
//! `ArticleRecord`; tags are JSON-encoded into a single column.

use crate::output::traits::{OutputHandler, OutputResult};
use crate::store::ArticleRecord;
use std::path::Path;

/// Header row shared by the tabular exports
pub const ARTICLE_COLUMNS: [&str; 9] = [
    "title",
    "content",
    "author",
    "date",
    "category",
    "url",
    "crawl_date",
    "source_url",
    "tags",
];

/// Flattens a record into cells in `ARTICLE_COLUMNS` order
///
/// Absent fields become empty cells.
pub(crate) fn record_cells(record: &ArticleRecord) -> OutputResult<[String; 9]> {
    let text = |field: &Option<String>| field.clone().unwrap_or_default();
    Ok([
        text(&record.title),
        text(&record.content),
        text(&record.author),
        text(&record.date),
        text(&record.category),
        record.url.clone(),
        record.crawl_date.to_rfc3339(),
        text(&record.source_url),
        serde_json::to_string(&record.tags)?,
    ])
}

/// Writes records as comma-separated values
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvOutputHandler;

impl OutputHandler for CsvOutputHandler {
    fn write(&self, records: &[ArticleRecord], path: &Path) -> OutputResult<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(ARTICLE_COLUMNS)?;
        for record in records {
            writer.write_record(&record_cells(record)?)?;
        }
        writer.flush()?;
        Ok(())
    }
}

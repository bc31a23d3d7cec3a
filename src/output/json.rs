//! JSON and JSON Lines writers

use crate::output::traits::{OutputHandler, OutputResult};
use crate::store::ArticleRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes all records as one pretty-printed JSON array
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonOutputHandler;

impl OutputHandler for JsonOutputHandler {
    fn write(&self, records: &[ArticleRecord], path: &Path) -> OutputResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Writes one JSON object per line
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLinesOutputHandler;

impl OutputHandler for JsonLinesOutputHandler {
    fn write(&self, records: &[ArticleRecord], path: &Path) -> OutputResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn records() -> Vec<ArticleRecord> {
        let crawled = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut first = ArticleRecord::new("https://newsday.co.tt/2020/01/05/a/", crawled);
        first.title = Some("Flooding in Penal".to_string());
        first.tags = vec!["Weather".to_string()];
        let second = ArticleRecord::new("https://newsday.co.tt/2020/01/05/b/", crawled);
        vec![first, second]
    }

    #[test]
    fn test_json_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        JsonOutputHandler.write(&records(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["title"], "Flooding in Penal");
        assert_eq!(array[0]["tags"][0], "Weather");
        assert!(array[1]["title"].is_null());
        assert_eq!(array[1]["crawl_date"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.jsonl");
        JsonLinesOutputHandler.write(&records(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<ArticleRecord> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed, records());
    }

    #[test]
    fn test_empty_export_is_empty_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.json");
        JsonOutputHandler.write(&[], &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }
}

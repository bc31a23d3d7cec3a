//! SQLite record writer
//!
//! Exports the result set into a standalone database with a single
//! `articles` table keyed by URL.

use crate::output::traits::{OutputHandler, OutputResult};
use crate::store::ArticleRecord;
use rusqlite::{params, Connection};
use std::path::Path;

/// Schema of the exported database
pub const ARTICLES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS articles (
    url TEXT PRIMARY KEY,
    title TEXT,
    content TEXT,
    author TEXT,
    date TEXT,
    category TEXT,
    tags TEXT NOT NULL,
    crawl_date TEXT NOT NULL,
    source_url TEXT
);

CREATE INDEX IF NOT EXISTS idx_articles_date ON articles(date);
CREATE INDEX IF NOT EXISTS idx_articles_category ON articles(category);
"#;

/// Writes records into an SQLite database file
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteOutputHandler;

impl SqliteOutputHandler {
    /// Inserts `records` into an open connection inside one transaction
    ///
    /// Tags are stored as a JSON array; `crawl_date` as RFC 3339.
    pub fn insert_records(conn: &mut Connection, records: &[ArticleRecord]) -> OutputResult<()> {
        conn.execute_batch(ARTICLES_SCHEMA)?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO articles
                 (url, title, content, author, date, category, tags, crawl_date, source_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;

            for record in records {
                let tags = serde_json::to_string(&record.tags)?;
                stmt.execute(params![
                    record.url,
                    record.title,
                    record.content,
                    record.author,
                    record.date,
                    record.category,
                    tags,
                    record.crawl_date.to_rfc3339(),
                    record.source_url,
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }
}

impl OutputHandler for SqliteOutputHandler {
    fn write(&self, records: &[ArticleRecord], path: &Path) -> OutputResult<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }

        let mut conn = Connection::open(path)?;
        Self::insert_records(&mut conn, records)?;

        tracing::debug!("Wrote {} articles to {}", records.len(), path.display());
        Ok(())
    }
}

//! Excel workbook writer

use crate::output::csv_output::{record_cells, ARTICLE_COLUMNS};
use crate::output::traits::{OutputHandler, OutputResult};
use crate::store::ArticleRecord;
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;

/// Longest text a single worksheet cell accepts
const MAX_CELL_CHARS: usize = 32_767;

/// Writes records to an `Articles` worksheet with a bold header row
#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxOutputHandler;

impl OutputHandler for XlsxOutputHandler {
    fn write(&self, records: &[ArticleRecord], path: &Path) -> OutputResult<()> {
        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Articles")?;
        for (col, name) in (0u16..).zip(ARTICLE_COLUMNS) {
            worksheet.write_string_with_format(0, col, name, &header)?;
        }

        for (row, record) in (1u32..).zip(records) {
            for (col, cell) in (0u16..).zip(record_cells(record)?) {
                if cell.is_empty() {
                    continue;
                }
                worksheet.write_string(row, col, clip_cell(&cell))?;
            }
        }

        workbook.save(path)?;
        Ok(())
    }
}

/// Truncates `text` to what a worksheet cell can hold
fn clip_cell(text: &str) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of a crawl run,
//! including counters, failures by kind and a sample of failed targets.

use crate::crawler::{CrawlReport, TargetKind};
use crate::output::traits::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Failed targets listed individually before the list is truncated
const MAX_LISTED_FAILURES: usize = 25;

/// Writes a markdown summary of `report` to `output_path`
///
/// # Arguments
///
/// * `report` - The finished run's report
/// * `outputs` - Files the run's records were written to
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(
    report: &CrawlReport,
    outputs: &[PathBuf],
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(report, outputs);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_summary(report: &CrawlReport, outputs: &[PathBuf]) -> String {
    let progress = &report.progress;
    let mut md = String::new();

    md.push_str("# Newsday Archive Crawl Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!(
        "- **Status**: {}\n",
        if report.cancelled {
            "Cancelled"
        } else {
            "Completed"
        }
    ));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        report.elapsed.as_secs_f64()
    ));
    if report.aborted_workers > 0 {
        md.push_str(&format!(
            "- **Aborted Workers**: {}\n",
            report.aborted_workers
        ));
    }
    md.push('\n');

    md.push_str("## Overall Statistics\n\n");
    md.push_str("| Measure | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Days planned | {} |\n", progress.days_total));
    md.push_str(&format!("| Days processed | {} |\n", progress.days_processed));
    md.push_str(&format!("| Days failed | {} |\n", progress.days_failed));
    md.push_str(&format!(
        "| Articles collected | {} |\n",
        progress.articles_collected
    ));
    md.push_str(&format!(
        "| Articles failed | {} |\n\n",
        progress.articles_failed
    ));

    if !progress.failures_by_kind.is_empty() {
        md.push_str("## Failures by Kind\n\n");
        md.push_str("| Kind | Count |\n");
        md.push_str("|------|-------|\n");
        for (kind, count) in &progress.failures_by_kind {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');
    }

    if !report.failures.is_empty() {
        md.push_str("## Failed Targets\n\n");
        md.push_str("| Target | URL | Error | Attempts |\n");
        md.push_str("|--------|-----|-------|----------|\n");
        for failure in report.failures.iter().take(MAX_LISTED_FAILURES) {
            let target = match &failure.target.kind {
                TargetKind::Index { day } => format!("index {}", day),
                TargetKind::Article { .. } => "article".to_string(),
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                target, failure.target.url, failure.error, failure.attempts
            ));
        }
        if report.failures.len() > MAX_LISTED_FAILURES {
            md.push_str(&format!(
                "\n...and {} more\n",
                report.failures.len() - MAX_LISTED_FAILURES
            ));
        }
        md.push('\n');
    }

    if !outputs.is_empty() {
        md.push_str("## Output Files\n\n");
        for path in outputs {
            md.push_str(&format!("- `{}`\n", path.display()));
        }
        md.push('\n');
    }

    md
}

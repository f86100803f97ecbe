//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of crawl results,
//! including statistics, failed pages and the link set of every page.

use crate::output::stats::CrawlStatistics;
use crate::output::traits::{CrawlReport, OutputResult};
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Generates a markdown summary of a crawl and writes it to a file
///
/// # Arguments
///
/// * `report` - The finished crawl
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(report)?;

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl report as markdown
///
/// Pages and errors are sorted by URL so the output is stable across runs.
pub fn format_markdown_summary(report: &CrawlReport) -> OutputResult<String> {
    let stats = CrawlStatistics::from_report(report);
    let mut md = String::new();

    writeln!(md, "# Sitewalk Crawl Summary\n")?;

    // Run metadata
    writeln!(md, "## Run Information\n")?;
    writeln!(md, "- **Seed**: {}", report.seed)?;
    writeln!(md, "- **Started**: {}", report.started_at.to_rfc3339())?;
    writeln!(md, "- **Finished**: {}", report.finished_at.to_rfc3339())?;
    writeln!(
        md,
        "- **Duration**: {:.2} seconds",
        stats.duration.as_secs_f64()
    )?;
    let status = if report.cancelled {
        "cancelled"
    } else {
        "completed"
    };
    writeln!(md, "- **Status**: {}", status)?;
    if report.cancelled {
        writeln!(md, "- **Unvisited Queued Pages**: {}", report.discarded_tasks)?;
    }
    writeln!(md)?;

    // Overall statistics
    writeln!(md, "## Overall Statistics\n")?;
    writeln!(md, "- **Pages Processed**: {}", stats.pages_processed)?;
    writeln!(md, "- **Pages Failed**: {}", stats.pages_failed)?;
    writeln!(md, "- **Total Links**: {}", stats.total_links)?;
    writeln!(md, "- **Unique Links**: {}", stats.unique_links)?;
    writeln!(md, "- **Success Rate**: {:.2}%\n", stats.success_rate())?;

    // Error summary
    if !stats.error_summary.is_empty() {
        writeln!(md, "## Error Summary\n")?;
        writeln!(md, "| Error Type | Count |")?;
        writeln!(md, "|------------|-------|")?;
        for (kind, count) in stats.sorted_errors() {
            writeln!(md, "| {} | {} |", kind, count)?;
        }
        writeln!(md)?;

        writeln!(md, "## Failed Pages\n")?;
        let mut errors: Vec<_> = report.errors.iter().collect();
        errors.sort_by(|a, b| a.target_url.as_str().cmp(b.target_url.as_str()));
        for error in errors {
            writeln!(md, "- {}: {}", error.target_url, error.cause)?;
        }
        writeln!(md)?;
    }

    // Per-page links
    if !report.results.is_empty() {
        writeln!(md, "## Pages\n")?;
        let mut results: Vec<_> = report.results.iter().collect();
        results.sort_by(|a, b| a.target_url.as_str().cmp(b.target_url.as_str()));

        for result in results {
            writeln!(md, "### {}\n", result.target_url)?;
            if result.links.is_empty() {
                writeln!(md, "_No in-scope links._\n")?;
                continue;
            }
            for link in &result.links {
                writeln!(md, "- {}", link)?;
            }
            writeln!(md)?;
        }
    }

    md.push_str("---\n\n");
    md.push_str("*Generated by Sitewalk*\n");

    Ok(md)
}

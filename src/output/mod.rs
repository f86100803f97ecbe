//! Output module for crawl results and summaries
//!
//! This module handles:
//! - The per-page result and error types produced by a crawl
//! - Streaming outcomes to observers and collecting them into a report
//! - Computing and printing crawl statistics
//! - Generating markdown summaries

mod collector;
mod markdown;
pub mod stats;
mod traits;

pub use collector::ReportCollector;
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{print_statistics, CrawlStatistics};
pub use traits::{
    CrawlObserver, CrawlReport, FailureKind, OutputError, OutputResult, PageError, PageFailure,
    PageResult,
};

/// Formats one page result the way the command-line tool prints it
///
/// `URL -> <target>: LINKS -> [<link> <link> ...]`
pub fn format_page_line(result: &PageResult) -> String {
    let links: Vec<&str> = result.links.iter().map(|l| l.as_str()).collect();
    format!("URL -> {}: LINKS -> [{}]", result.target_url, links.join(" "))
}

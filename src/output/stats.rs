//! Statistics derived from a crawl report
//!
//! This module provides functionality for summarising a [`CrawlReport`] and
//! displaying the summary.

use crate::output::traits::{CrawlReport, FailureKind};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Pages fetched and parsed
    pub pages_processed: u64,

    /// Pages reported as errors
    pub pages_failed: u64,

    /// In-scope links over all pages, duplicates included
    pub total_links: u64,

    /// Distinct in-scope links over all pages
    pub unique_links: u64,

    /// Error counts by failure kind
    pub error_summary: HashMap<FailureKind, u64>,

    /// Wall-clock duration of the crawl
    pub duration: Duration,

    /// Whether the crawl was cancelled
    pub cancelled: bool,

    /// Queued pages dropped because of cancellation
    pub discarded_tasks: u64,
}

impl CrawlStatistics {
    /// Computes statistics from a finished crawl
    pub fn from_report(report: &CrawlReport) -> Self {
        let total_links = report.results.iter().map(|r| r.links.len() as u64).sum();

        let unique_links = report
            .results
            .iter()
            .flat_map(|r| r.links.iter())
            .collect::<HashSet<_>>()
            .len() as u64;

        let mut error_summary = HashMap::new();
        for error in &report.errors {
            *error_summary.entry(error.cause.kind()).or_insert(0) += 1;
        }

        Self {
            pages_processed: report.results.len() as u64,
            pages_failed: report.errors.len() as u64,
            total_links,
            unique_links,
            error_summary,
            duration: report.duration(),
            cancelled: report.cancelled,
            discarded_tasks: report.discarded_tasks as u64,
        }
    }

    /// Returns the number of pages with an outcome
    pub fn pages_attempted(&self) -> u64 {
        self.pages_processed + self.pages_failed
    }

    /// Returns the share of attempted pages that succeeded, as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempted = self.pages_attempted();
        if attempted == 0 {
            return 0.0;
        }
        (self.pages_processed as f64 / attempted as f64) * 100.0
    }

    /// Returns pages attempted per second
    pub fn pages_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.pages_attempted() as f64 / secs
    }

    /// Returns the error summary sorted by count, largest first
    pub fn sorted_errors(&self) -> Vec<(FailureKind, u64)> {
        let mut errors: Vec<_> = self.error_summary.iter().map(|(k, v)| (*k, *v)).collect();
        errors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        errors
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages processed: {}", stats.pages_processed);
    println!("  Pages failed: {}", stats.pages_failed);
    println!("  Total links found: {}", stats.total_links);
    println!("  Unique links: {}", stats.unique_links);
    println!(
        "  Duration: {:.2}s ({:.1} pages/sec)",
        stats.duration.as_secs_f64(),
        stats.pages_per_second()
    );
    println!();

    if !stats.error_summary.is_empty() {
        println!("Error Summary:");
        for (kind, count) in stats.sorted_errors() {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    if stats.cancelled {
        println!(
            "Crawl was cancelled; {} queued pages were not visited",
            stats.discarded_tasks
        );
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages successfully processed)",
        stats.success_rate(),
        stats.pages_processed,
        stats.pages_attempted()
    );
}

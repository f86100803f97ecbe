//! Crawl result types and the observer interface
//!
//! This module defines the per-page outputs of a crawl, the report assembled
//! from them and the trait used to stream them out of the worker pool.

use crate::crawler::FetchError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<fmt::Error> for OutputError {
    fn from(e: fmt::Error) -> Self {
        OutputError::Format(e.to_string())
    }
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Links found on one successfully fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    /// The page that was fetched
    pub target_url: Url,

    /// In-scope absolute links in document order, duplicates kept
    pub links: Vec<Url>,
}

/// A page that could not be processed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to extract links from {target_url}: {cause}")]
pub struct PageError {
    /// The page that failed
    pub target_url: Url,

    /// What went wrong
    pub cause: PageFailure,
}

/// Underlying cause of a [`PageError`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageFailure {
    /// Every fetch attempt failed
    #[error("failed to make the request: {0}")]
    Fetch(#[from] FetchError),

    /// The page's task handler panicked
    #[error("worker panicked: {0}")]
    WorkerPanic(String),
}

/// Coarse classification of page failures, used for statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    Timeout,
    Connect,
    Transport,
    InvalidRequest,
    Cancelled,
    WorkerPanic,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Connect => "connect",
            FailureKind::Transport => "transport",
            FailureKind::InvalidRequest => "invalid request",
            FailureKind::Cancelled => "cancelled",
            FailureKind::WorkerPanic => "worker panic",
        };
        f.write_str(label)
    }
}

impl PageFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            PageFailure::Fetch(FetchError::Timeout(_)) => FailureKind::Timeout,
            PageFailure::Fetch(FetchError::Connect(_)) => FailureKind::Connect,
            PageFailure::Fetch(FetchError::Transport(_)) => FailureKind::Transport,
            PageFailure::Fetch(FetchError::InvalidRequest(_)) => FailureKind::InvalidRequest,
            PageFailure::Fetch(FetchError::Cancelled) => FailureKind::Cancelled,
            PageFailure::WorkerPanic(_) => FailureKind::WorkerPanic,
        }
    }
}

/// Receives page outcomes as a crawl produces them
///
/// Methods are called from worker tasks, possibly concurrently, in no
/// particular order across pages. Implementations serialize their own side
/// effects and should return quickly: a worker stays busy until the call
/// returns.
pub trait CrawlObserver: Send + Sync {
    /// Called once for every page that was fetched
    fn on_page(&self, result: PageResult);

    /// Called once for every page that failed
    fn on_error(&self, error: PageError);
}

/// Everything one crawl run produced
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Where the crawl started
    pub seed: Url,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Whether the run was cut short by cancellation
    pub cancelled: bool,

    /// Queued pages dropped because of cancellation
    pub discarded_tasks: usize,

    pub results: Vec<PageResult>,
    pub errors: Vec<PageError>,
}

impl CrawlReport {
    /// Returns how long the crawl ran
    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Returns the number of pages with an outcome, success or failure
    pub fn pages_attempted(&self) -> usize {
        self.results.len() + self.errors.len()
    }

    /// Returns the result for a page, if it was fetched
    pub fn result_for(&self, url: &Url) -> Option<&PageResult> {
        self.results.iter().find(|r| &r.target_url == url)
    }

    /// Returns the error for a page, if it failed
    pub fn error_for(&self, url: &Url) -> Option<&PageError> {
        self.errors.iter().find(|e| &e.target_url == url)
    }
}

use crate::crawler::CrawlOutcome;
use crate::output::{CrawlObserver, CrawlReport, PageError, PageResult};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Observer that accumulates every outcome for a [`CrawlReport`]
#[derive(Debug, Default)]
pub struct ReportCollector {
    results: Mutex<Vec<PageResult>>,
    errors: Mutex<Vec<PageError>>,
}

impl ReportCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the collected outcomes into a report
    ///
    /// The collector is left empty.
    pub fn take_report(&self, outcome: &CrawlOutcome) -> CrawlReport {
        CrawlReport {
            seed: outcome.seed.clone(),
            started_at: outcome.started_at,
            finished_at: outcome.finished_at,
            cancelled: outcome.cancelled,
            discarded_tasks: outcome.discarded_tasks,
            results: std::mem::take(&mut *lock(&self.results)),
            errors: std::mem::take(&mut *lock(&self.errors)),
        }
    }
}

impl CrawlObserver for ReportCollector {
    fn on_page(&self, result: PageResult) {
        lock(&self.results).push(result);
    }

    fn on_error(&self, error: PageError) {
        lock(&self.errors).push(error);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

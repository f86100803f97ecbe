//! Crawler coordinator - main crawl orchestration logic
//!
//! This module turns one seed URL into a stream of page outcomes:
//! - Claiming pages in the visited set before they are queued
//! - Feeding newly discovered in-scope links back into the worker pool
//! - Fetching with retry, extracting links and filtering them to the seed's host
//! - Reporting results and failures to an observer as they happen

use crate::config::{validate, validate_concurrency, Config, CrawlerConfig};
use crate::crawler::fetcher::{
    fetch_with_retry, FetchError, HttpFetcher, PageFetcher, RetryPolicy,
};
use crate::crawler::parser::extract_links;
use crate::crawler::pool::WorkerPool;
use crate::output::{
    CrawlObserver, CrawlReport, PageError, PageFailure, PageResult, ReportCollector,
};
use crate::state::VisitedSet;
use crate::url::{filter_in_scope, parse_seed_url, VisitedKey};
use crate::{ConfigError, SitewalkError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// One page waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask(Url);

impl CrawlTask {
    pub fn new(url: Url) -> Self {
        Self(url)
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn into_url(self) -> Url {
        self.0
    }
}

/// Summary of a finished crawl run, without the page outcomes themselves
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// The normalized seed
    pub seed: Url,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Whether the run was stopped by cancellation
    pub cancelled: bool,

    /// Queued pages dropped because of cancellation
    pub discarded_tasks: usize,

    /// Pages taken off the queue, including fetches abandoned on cancellation
    pub pages_processed: u64,
}

/// Same-host crawler
///
/// A `Crawler` holds configuration and a fetcher only. Every call to
/// [`Crawler::crawl_with_observer`] or [`Crawler::crawl_from`] gets its own
/// visited set and worker pool, so runs never share state and one crawler can
/// be reused.
pub struct Crawler {
    config: CrawlerConfig,
    fetcher: Arc<dyn PageFetcher>,
}

impl Crawler {
    /// Creates a crawler around any fetcher
    pub fn new(config: CrawlerConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { config, fetcher }
    }

    /// Creates a crawler fetching over HTTP as configured
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to crawl
    /// * `Err(SitewalkError)` - The HTTP client could not be built
    pub fn from_config(config: &Config) -> Result<Self, SitewalkError> {
        let fetcher = HttpFetcher::from_config(&config.crawler, &config.user_agent)?;
        Ok(Self::new(config.crawler.clone(), Arc::new(fetcher)))
    }

    /// Returns the crawler settings
    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Crawls every page reachable from `seed` on the seed's host
    ///
    /// Outcomes are streamed to `observer` from the worker tasks while the
    /// crawl runs: one [`PageResult`] per fetched page, one [`PageError`] per
    /// page whose fetch still failed after retries or whose handler panicked.
    /// Each page (by host and path) is attempted at most once.
    ///
    /// Returns when no page is queued and no worker is busy, or promptly
    /// after `cancel` fires. Fetches interrupted by cancellation produce no
    /// outcome.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - The crawl ran, completely or until cancelled
    /// * `Err(SitewalkError)` - The seed is not a crawlable URL, or the
    ///   worker and queue settings are invalid
    pub async fn crawl_with_observer(
        &self,
        seed: &Url,
        cancel: &CancellationToken,
        observer: Arc<dyn CrawlObserver>,
    ) -> Result<CrawlOutcome, SitewalkError> {
        validate_concurrency(&self.config)?;
        let seed = parse_seed_url(seed.as_str())?;
        let started_at = Utc::now();

        tracing::info!(
            "Starting crawl of {} with {} workers",
            seed,
            self.config.workers
        );

        let run = Arc::new(CrawlRun {
            visited: VisitedSet::new(),
            pool: WorkerPool::new(
                self.config.workers,
                self.config.queue_capacity,
                self.config.poll_interval(),
            )?,
            fetcher: self.fetcher.clone(),
            retry: RetryPolicy::from_config(&self.config),
            cancel: cancel.clone(),
            observer,
        });

        if let Some(key) = VisitedKey::from_url(&seed) {
            run.visited.mark_visited(key);
        }
        run.pool.add_task(CrawlTask::new(seed.clone())).await?;

        let handler = {
            let run = run.clone();
            move |task: CrawlTask| {
                let run = run.clone();
                async move { run.process(task).await }
            }
        };

        let on_panic = {
            let run = run.clone();
            move |task: CrawlTask, message: String| {
                run.observer.on_error(PageError {
                    target_url: task.into_url(),
                    cause: PageFailure::WorkerPanic(message),
                });
            }
        };

        let pool_outcome = run.pool.process_tasks(handler, on_panic, cancel).await;

        let outcome = CrawlOutcome {
            seed,
            started_at,
            finished_at: Utc::now(),
            cancelled: pool_outcome.cancelled,
            discarded_tasks: pool_outcome.discarded_tasks,
            pages_processed: pool_outcome.tasks_processed,
        };

        if outcome.cancelled {
            tracing::warn!(
                "Crawl of {} cancelled after {} pages, {} queued pages dropped",
                outcome.seed,
                outcome.pages_processed,
                outcome.discarded_tasks
            );
        } else {
            tracing::info!(
                "Crawl of {} complete: {} pages processed, {} distinct pages seen",
                outcome.seed,
                outcome.pages_processed,
                run.visited.len()
            );
        }

        Ok(outcome)
    }

    /// Crawls from `seed` and collects every outcome into a report
    pub async fn crawl_from(
        &self,
        seed: &Url,
        cancel: &CancellationToken,
    ) -> Result<CrawlReport, SitewalkError> {
        let collector = Arc::new(ReportCollector::new());
        let outcome = self
            .crawl_with_observer(seed, cancel, collector.clone())
            .await?;
        Ok(collector.take_report(&outcome))
    }
}

/// Runs a complete crawl as described by `config`
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Every page outcome of the run
/// * `Err(SitewalkError)` - Invalid configuration, or HTTP client failure
pub async fn crawl(
    config: &Config,
    cancel: &CancellationToken,
) -> Result<CrawlReport, SitewalkError> {
    validate(config)?;
    let Some(seed_url) = config.crawler.seed_url.as_deref() else {
        return Err(ConfigError::Validation("seed-url is required".to_string()).into());
    };
    let seed = parse_seed_url(seed_url)?;

    Crawler::from_config(config)?.crawl_from(&seed, cancel).await
}

/// State of one crawl run, shared by its workers
struct CrawlRun {
    visited: VisitedSet,
    pool: WorkerPool<CrawlTask>,
    fetcher: Arc<dyn PageFetcher>,
    retry: RetryPolicy,
    cancel: CancellationToken,
    observer: Arc<dyn CrawlObserver>,
}

impl CrawlRun {
    async fn process(&self, task: CrawlTask) {
        let url = task.url();
        tracing::debug!("Fetching {}", url);

        let fetched =
            fetch_with_retry(self.fetcher.as_ref(), url, &self.retry, &self.cancel).await;
        let body = match fetched {
            Ok(body) => body,
            Err(FetchError::Cancelled) => {
                tracing::debug!("Fetch of {} abandoned on cancellation", url);
                return;
            }
            Err(e) => {
                tracing::warn!("Giving up on {}: {}", url, e);
                self.observer.on_error(PageError {
                    target_url: url.clone(),
                    cause: PageFailure::Fetch(e),
                });
                return;
            }
        };

        let links = filter_in_scope(url, &extract_links(&body));
        tracing::debug!("Found {} in-scope links on {}", links.len(), url);

        for link in &links {
            let Some(key) = VisitedKey::from_url(link) else {
                continue;
            };
            if !self.visited.mark_visited(key) {
                continue;
            }
            if let Err(e) = self.pool.add_task(CrawlTask::new(link.clone())).await {
                if self.cancel.is_cancelled() {
                    tracing::debug!("Not queueing {}: {}", link, e);
                } else {
                    tracing::error!("Lost discovered page {}: {}", link, e);
                }
            }
        }

        self.observer.on_page(PageResult {
            target_url: task.into_url(),
            links,
        });
    }
}

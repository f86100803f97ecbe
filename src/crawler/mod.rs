//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The shared task queue and the worker pool draining it
//! - HTTP fetching with retry logic
//! - HTML link extraction
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
mod pool;
mod queue;

pub use coordinator::{crawl, CrawlOutcome, CrawlTask, Crawler};
pub use fetcher::{fetch_with_retry, FetchError, HttpFetcher, PageFetcher, RetryPolicy};
pub use parser::extract_links;
pub use pool::{PoolOutcome, WorkerPool};
pub use queue::{PoolError, TaskQueue};

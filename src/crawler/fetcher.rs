//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the crawler's user agent
//! - A single GET returning the body whatever the status code
//! - Classifying transport failures
//! - Bounded, cancellable retries

use crate::config::{CrawlerConfig, UserAgentConfig};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Upper bound for the TCP connect phase
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure of a single page fetch
///
/// HTTP status codes are never errors here; a response with any status is a
/// successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to build request: {0}")]
    InvalidRequest(String),

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Returns whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout(_) | FetchError::Connect(_) | FetchError::Transport(_)
        )
    }
}

/// A single HTTP GET
///
/// Implementations return the response body regardless of status code and an
/// error only on transport failure or timeout. They must be safe to call from
/// many workers at once.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &Url) -> Result<String, FetchError>;
}

/// [`PageFetcher`] backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Builds a fetcher with the crawler's user agent and per-request timeout
    ///
    /// # Arguments
    ///
    /// * `user_agent` - Crawler identification sent with every request
    /// * `timeout` - Whole-request timeout, body included
    ///
    /// # Returns
    ///
    /// * `Ok(HttpFetcher)` - Ready to use
    /// * `Err(reqwest::Error)` - The TLS backend could not be initialised
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use sitewalk::config::UserAgentConfig;
    /// use sitewalk::crawler::HttpFetcher;
    ///
    /// let user_agent = UserAgentConfig {
    ///     crawler_name: "Sitewalk".to_string(),
    ///     crawler_version: "1.0".to_string(),
    ///     contact_url: Some("https://example.com/bot".to_string()),
    /// };
    ///
    /// let fetcher = HttpFetcher::new(&user_agent, Duration::from_secs(30)).unwrap();
    /// ```
    pub fn new(user_agent: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent.user_agent_string())
            .timeout(timeout)
            .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, timeout })
    }

    /// Builds a fetcher from the crawler and user agent sections of a config
    pub fn from_config(
        crawler: &CrawlerConfig,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, reqwest::Error> {
        Self::new(user_agent, crawler.fetch_timeout())
    }

    /// Returns the per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn classify(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if error.is_connect() {
            FetchError::Connect(error.to_string())
        } else if error.is_builder() {
            FetchError::InvalidRequest(error.to_string())
        } else {
            FetchError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            // Error pages are parsed like any other page.
            tracing::debug!("{} returned HTTP {}", url, status.as_u16());
        }

        response.text().await.map_err(|e| self.classify(e))
    }
}

/// How many times a page fetch is attempted and how long to pause in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included; zero behaves like one
    pub max_attempts: u32,

    /// Pause between consecutive attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay())
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

/// Fetches a page, retrying transient failures
///
/// Timeouts and transport failures are retried until the policy's attempt
/// budget is spent; the error of the last attempt is returned. Request
/// construction failures are returned at once. Attempts run sequentially in
/// the calling task.
///
/// Cancellation aborts the in-flight attempt or the pause between attempts
/// and yields [`FetchError::Cancelled`].
pub async fn fetch_with_retry(
    fetcher: &dyn PageFetcher,
    url: &Url,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<String, FetchError> {
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            result = fetcher.fetch_page(url) => result,
        };

        let error = match result {
            Ok(body) => return Ok(body),
            Err(e) => e,
        };

        if !error.is_retryable() || attempt >= attempts {
            return Err(error);
        }

        tracing::warn!(
            "Attempt {}/{} for {} failed: {}, retrying",
            attempt,
            attempts,
            url,
            error
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            _ = tokio::time::sleep(policy.delay) => {}
        }

        attempt += 1;
    }
}

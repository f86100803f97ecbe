use crate::config::types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use crate::url::parse_seed_url;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// Runs after command-line overrides have been merged, so a missing seed URL
/// is an error here even though the file alone may omit it.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let seed = config.seed_url.as_deref().ok_or_else(|| {
        ConfigError::Validation("seed-url is required (set it in [crawler] or pass --url)".to_string())
    })?;

    parse_seed_url(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed-url '{}': {}", seed, e)))?;

    validate_concurrency(config)?;

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch-timeout-secs must be >= 1, got {}",
            config.fetch_timeout_secs
        )));
    }

    Ok(())
}

/// Validates the worker and queue settings a crawl run is built from
///
/// Checked again by every crawl, since a [`crate::Crawler`] can be built from
/// settings that never went through [`validate`].
pub fn validate_concurrency(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 {
        return Err(ConfigError::Validation(format!(
            "workers must be >= 1, got {}",
            config.workers
        )));
    }

    if config.poll_interval_ms < 1 {
        return Err(ConfigError::Validation(format!(
            "poll-interval-ms must be >= 1, got {}",
            config.poll_interval_ms
        )));
    }

    if let Some(capacity) = config.queue_capacity {
        if capacity < config.workers {
            return Err(ConfigError::Validation(format!(
                "queue-capacity ({}) must be >= workers ({})",
                capacity, config.workers
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric, hyphens and underscores only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler-version cannot be empty".to_string(),
        ));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if let Some(path) = &config.summary_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "summary-path cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

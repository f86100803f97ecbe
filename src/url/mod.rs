//! URL handling module for Sitewalk
//!
//! This module provides host identity extraction, the normalized visit key used
//! for deduplication, seed URL validation and the same-host scope filter.

mod authority;
mod key;
mod scope;

use crate::UrlError;
use url::Url;

// Re-export main functions
pub use authority::{host_authority, is_same_host};
pub use key::VisitedKey;
pub use scope::{filter_in_scope, resolve_in_scope};

/// Parses and validates the seed URL of a crawl
///
/// The seed must be an absolute `http` or `https` URL with a host. Anything
/// else is a configuration error and the crawl never starts.
///
/// # Arguments
///
/// * `url_str` - The seed URL as supplied by the caller
///
/// # Returns
///
/// * `Ok(Url)` - The parsed seed, fragment removed
/// * `Err(UrlError)` - The seed is malformed, has no host or uses another scheme
///
/// # Examples
///
/// ```
/// use sitewalk::url::parse_seed_url;
///
/// let seed = parse_seed_url("https://example.com/start#top").unwrap();
/// assert_eq!(seed.as_str(), "https://example.com/start");
///
/// assert!(parse_seed_url("ftp://example.com/").is_err());
/// assert!(parse_seed_url("/relative/path").is_err());
/// ```
pub fn parse_seed_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if !is_crawlable_scheme(url.scheme()) {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if host_authority(&url).is_none() {
        return Err(UrlError::MissingHost(url_str.to_string()));
    }

    url.set_fragment(None);
    Ok(url)
}

/// Returns true for the schemes the crawler is willing to fetch
pub fn is_crawlable_scheme(scheme: &str) -> bool {
    scheme == "http" || scheme == "https"
}

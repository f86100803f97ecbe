use url::Url;

/// Extracts the host identity of a URL
///
/// The identity is the lowercase host followed by `:port` when the URL carries
/// an explicit, non-default port. The scheme is not part of it, so
/// `http://example.com/` and `https://example.com/` share a host while
/// `example.com:8080` does not.
///
/// # Arguments
///
/// * `url` - The URL to extract the host identity from
///
/// # Returns
///
/// * `Some(String)` - The host identity
/// * `None` - If the URL has no host (e.g. `mailto:` or `data:` URLs)
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sitewalk::url::host_authority;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(host_authority(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(host_authority(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn host_authority(url: &Url) -> Option<String> {
    let host = url.host_str().filter(|h| !h.is_empty())?.to_lowercase();

    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Returns true if both URLs have the same host identity
pub fn is_same_host(a: &Url, b: &Url) -> bool {
    match (host_authority(a), host_authority(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

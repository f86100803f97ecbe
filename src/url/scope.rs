//! Scope filtering for discovered link references
//!
//! A reference is in scope when, resolved against the page it was found on,
//! it uses `http`/`https` and lives on the same host as that page.

use crate::url::{is_crawlable_scheme, is_same_host};
use url::Url;

/// Resolves raw link references and keeps the ones inside the crawl's host
///
/// # Rules
///
/// - Relative (`/a`, `a`, `../a`) and protocol-relative (`//host/a`)
///   references are resolved against `base_url`
/// - Resolved URLs whose scheme is not `http` or `https` are dropped
///   (`mailto:`, `ftp:`, `javascript:`, `tel:`, `data:` ...)
/// - Resolved URLs whose host differs from `base_url`'s host are dropped
/// - Fragments are removed; the query string is kept
/// - References that fail to parse are dropped
///
/// Order is preserved and duplicates are kept; deduplication of visits happens
/// later against the visited set, not here.
///
/// # Arguments
///
/// * `base_url` - The URL of the page the references were found on
/// * `references` - Raw `href` values
///
/// # Returns
///
/// The absolute in-scope URLs, in the order they were found
///
/// # Example
///
/// ```
/// use url::Url;
/// use sitewalk::url::filter_in_scope;
///
/// let base = Url::parse("https://example.com/docs/").unwrap();
/// let refs = vec![
///     "intro".to_string(),
///     "https://other.example/x".to_string(),
///     "/abc#frag".to_string(),
///     "mailto:team@example.com".to_string(),
/// ];
///
/// let links = filter_in_scope(&base, &refs);
/// let links: Vec<&str> = links.iter().map(|u| u.as_str()).collect();
/// assert_eq!(links, vec!["https://example.com/docs/intro", "https://example.com/abc"]);
/// ```
pub fn filter_in_scope<S: AsRef<str>>(base_url: &Url, references: &[S]) -> Vec<Url> {
    references
        .iter()
        .filter_map(|reference| resolve_in_scope(base_url, reference.as_ref()))
        .collect()
}

/// Resolves a single reference, returning it only if it is in scope
pub fn resolve_in_scope(base_url: &Url, reference: &str) -> Option<Url> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    let mut resolved = base_url.join(reference).ok()?;

    if !is_crawlable_scheme(resolved.scheme()) {
        return None;
    }

    if !is_same_host(base_url, &resolved) {
        return None;
    }

    resolved.set_fragment(None);
    Some(resolved)
}

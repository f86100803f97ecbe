use crate::url::host_authority;
use std::fmt;
use url::Url;

/// Normalized identity of a page, used to decide first-time discovery
///
/// A key is the page's host identity followed by its path. The scheme, query
/// string and fragment are ignored, so all of these map to the same key:
///
/// - `http://example.com/docs`
/// - `https://example.com/docs?page=2`
/// - `https://EXAMPLE.com/docs#install`
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sitewalk::url::VisitedKey;
///
/// let a = VisitedKey::from_url(&Url::parse("http://example.com/docs?x=1").unwrap()).unwrap();
/// let b = VisitedKey::from_url(&Url::parse("https://example.com/docs#top").unwrap()).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "example.com/docs");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisitedKey(String);

impl VisitedKey {
    /// Builds the key for a URL
    ///
    /// Returns `None` for URLs without a host, which are never crawlable.
    pub fn from_url(url: &Url) -> Option<Self> {
        let authority = host_authority(url)?;
        Some(Self(format!("{}{}", authority, url.path())))
    }

    /// Returns the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisitedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

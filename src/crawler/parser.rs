//! HTML link extraction
//!
//! Pulls raw `href` values out of `<a>` elements. Resolution and scope checks
//! happen later in [`crate::url::filter_in_scope`]; this module never looks at
//! what a reference points to.

use scraper::{Html, Selector};

/// Extracts the raw link references of a page body
///
/// Every `<a>` element carrying an `href` attribute contributes its trimmed,
/// non-empty value, in document order. Values are returned as written, so
/// relative references and fragments are kept.
///
/// Parsing never fails: malformed markup yields whatever anchors the HTML5
/// parser recovers, and non-HTML bodies (CSS, JavaScript, plain text) yield
/// an empty list.
///
/// # Example
///
/// ```
/// use sitewalk::crawler::extract_links;
///
/// let body = r#"<html><body><a href="/a">A</a><a>no href</a><a href="b#top">B</a></body></html>"#;
/// assert_eq!(extract_links(body), vec!["/a", "b#top"]);
/// ```
pub fn extract_links(body: &str) -> Vec<String> {
    let document = Html::parse_document(body);

    let anchor_selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    document
        .select(&anchor_selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}

//! URL handling for article links
//!
//! Article URLs are the result store's key, so every link found on an index
//! page is normalized before it is fetched or stored.

mod normalize;

pub use normalize::normalize_url;

use url::Url;

/// Returns true if both URLs point at the same host (case-insensitive)
///
/// # Examples
///
/// ```
/// use newsday_archiver::url::same_host;
/// use url::Url;
///
/// let a = Url::parse("https://newsday.co.tt/2020/01/01/").unwrap();
/// let b = Url::parse("https://NEWSDAY.co.tt/news/story/").unwrap();
/// assert!(same_host(&a, &b));
/// ```
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
        _ => false,
    }
}

use crate::UrlError;
use url::Url;

/// Tracking query parameters dropped from article URLs
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
    "amp",
];

/// Normalizes an article URL into its storage key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only http and https
/// 3. Lowercase the host
/// 4. Remove dot segments and repeated slashes from the path, keeping a
///    trailing slash if the site uses one
/// 5. Remove the fragment
/// 6. Remove tracking query parameters and sort the rest
/// 7. Remove an empty query string
///
/// # Examples
///
/// ```
/// use newsday_archiver::url::normalize_url;
///
/// let url = normalize_url("https://Newsday.co.tt/2020/01/02/story/?utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://newsday.co.tt/2020/01/02/story/");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) => {
            let lowered = host.to_lowercase();
            url.set_host(Some(&lowered))
                .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
        }
        None => return Err(UrlError::MissingDomain),
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Removes dot segments and empty segments from a path
fn normalize_path(path: &str) -> String {
    let trailing_slash = path.len() > 1 && path.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", segments.join("/"));
    if trailing_slash {
        result.push('/');
    }
    result
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

use crate::UrlError;
use url::Url;

/// Normalizes a URL so that equivalent page and asset addresses share one ledger key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not HTTP or HTTPS
/// 3. Remove the fragment (everything after #)
/// 4. Remove the configured ignorable query parameters
/// 5. Remove the empty query string (trailing ?)
///
/// Remaining query parameters keep their original order.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
/// * `ignore_query` - Names of query parameters that never distinguish two URLs
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use blog_sync::url::fix_url;
///
/// let ignore = vec!["utm_source".to_string()];
/// let url = fix_url("http://example.com/a?utm_source=feed&b=1#top", &ignore).unwrap();
/// assert_eq!(url.as_str(), "http://example.com/a?b=1");
/// ```
pub fn fix_url(url_str: &str, ignore_query: &[String]) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_ignored_param(key, ignore_query))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

/// Checks if a query parameter is on the ignore list
fn is_ignored_param(key: &str, ignore_query: &[String]) -> bool {
    ignore_query.iter().any(|ignored| ignored == key)
}

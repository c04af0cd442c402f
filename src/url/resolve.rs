//! Link resolution and path helpers

use url::Url;

/// Resolves a link href against the page it was found on
///
/// Returns None if the link should be ignored:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_href(base_url: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if is_http(&absolute_url) => Some(absolute_url),
        _ => None,
    }
}

/// Resolves a "next page" href
///
/// Hrefs that climb with leading `../` segments are resolved against the
/// current page path treated as a directory, so `../3` from `/list/2` lands
/// on `/list/3`. Everything else resolves like [`resolve_href`].
pub fn resolve_next_href(page_url: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if !href.starts_with("../") {
        return resolve_href(page_url, href);
    }

    let mut directory = page_url.clone();
    if !directory.path().ends_with('/') {
        let path = format!("{}/", directory.path());
        directory.set_path(&path);
    }
    directory.set_query(None);
    resolve_href(&directory, href)
}

/// Returns true if the response landed on the same host and path that was requested
pub fn same_location(requested: &Url, actual: &Url) -> bool {
    requested.host_str() == actual.host_str() && requested.path() == actual.path()
}

/// Returns the lowercase extension of the last path segment, if any
pub fn path_extension(url: &Url) -> Option<String> {
    let name = file_name(url)?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Returns true if the URL path ends with one of the given extensions
pub fn has_extension(url: &Url, extensions: &[String]) -> bool {
    match path_extension(url) {
        Some(ext) => extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)),
        None => false,
    }
}

/// Returns the last non-empty path segment, if any
pub fn file_name(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    if last.is_empty() {
        None
    } else {
        Some(last.to_string())
    }
}

/// Derives a folder title from the URL path
///
/// The directory part and the file stem are joined and every `/` becomes `_`,
/// so `/2016/07/post.html` yields `2016_07_post`. The site root yields `index`.
pub fn path_title(url: &Url) -> String {
    let path = url.path().trim_matches('/');

    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", path),
    };

    let stem = match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    };

    let title = if dir.is_empty() {
        stem.to_string()
    } else {
        format!("{}_{}", dir.replace('/', "_"), stem)
    };

    if title.is_empty() {
        "index".to_string()
    } else {
        title
    }
}

fn is_http(url: &Url) -> bool {
    url.scheme() == "http" || url.scheme() == "https"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://example.com/blog/list/2").unwrap()
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        assert_eq!(
            resolve_href(&page(), "/img/a.jpg").unwrap().as_str(),
            "https://example.com/img/a.jpg"
        );
        assert_eq!(
            resolve_href(&page(), "https://cdn.example.com/b.png").unwrap().as_str(),
            "https://cdn.example.com/b.png"
        );
        assert_eq!(
            resolve_href(&page(), "3").unwrap().as_str(),
            "https://example.com/blog/list/3"
        );
    }

    #[test]
    fn test_resolve_skips_special_links() {
        assert!(resolve_href(&page(), "javascript:void(0)").is_none());
        assert!(resolve_href(&page(), "mailto:a@example.com").is_none());
        assert!(resolve_href(&page(), "#top").is_none());
        assert!(resolve_href(&page(), "   ").is_none());
    }

    #[test]
    fn test_next_href_with_parent_segments() {
        let next = resolve_next_href(&page(), "../3").unwrap();
        assert_eq!(next.as_str(), "https://example.com/blog/list/3");

        let next = resolve_next_href(&page(), "../../archive").unwrap();
        assert_eq!(next.as_str(), "https://example.com/blog/archive");
    }

    #[test]
    fn test_next_href_plain() {
        let next = resolve_next_href(&page(), "/page2").unwrap();
        assert_eq!(next.as_str(), "https://example.com/page2");
    }

    #[test]
    fn test_same_location() {
        let a = Url::parse("https://example.com/post?id=1").unwrap();
        let b = Url::parse("https://example.com/post?id=2").unwrap();
        let c = Url::parse("https://example.com/login").unwrap();
        let d = Url::parse("https://other.com/post").unwrap();
        assert!(same_location(&a, &b));
        assert!(!same_location(&a, &c));
        assert!(!same_location(&a, &d));
    }

    #[test]
    fn test_path_extension() {
        let url = Url::parse("https://example.com/img/A.JPG?size=large").unwrap();
        assert_eq!(path_extension(&url).as_deref(), Some("jpg"));

        let url = Url::parse("https://example.com/posts/").unwrap();
        assert_eq!(path_extension(&url), None);

        let url = Url::parse("https://example.com/.hidden").unwrap();
        assert_eq!(path_extension(&url), None);
    }

    #[test]
    fn test_has_extension() {
        let exts = vec!["jpg".to_string(), "png".to_string()];
        let url = Url::parse("https://example.com/a.PNG").unwrap();
        assert!(has_extension(&url, &exts));
        let url = Url::parse("https://example.com/a.html").unwrap();
        assert!(!has_extension(&url, &exts));
    }

    #[test]
    fn test_path_title() {
        let url = Url::parse("https://example.com/2016/07/post.html").unwrap();
        assert_eq!(path_title(&url), "2016_07_post");

        let url = Url::parse("https://example.com/page2").unwrap();
        assert_eq!(path_title(&url), "page2");

        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(path_title(&url), "index");

        let url = Url::parse("https://example.com/gallery/summer/").unwrap();
        assert_eq!(path_title(&url), "gallery_summer");
    }

    #[test]
    fn test_file_name() {
        let url = Url::parse("https://example.com/img/a.jpg").unwrap();
        assert_eq!(file_name(&url).as_deref(), Some("a.jpg"));
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(file_name(&url), None);
    }
}

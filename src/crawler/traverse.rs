//! Resolution of the first page of a crawl

use crate::crawler::fetcher::PageRenderer;
use crate::crawler::parser::first_link;
use scraper::Selector;
use url::Url;

/// Finds the page a crawl starts from
///
/// Without a page selector the home URL itself is the first page and nothing
/// is fetched. Otherwise the home page is rendered and the first element
/// matching `selector` must be an anchor; its href is the first page.
///
/// # Returns
///
/// * `Some(Url)` - The first page
/// * `None` - The home page failed to render or had no usable match
pub async fn traverse<R>(renderer: &R, home: &Url, selector: Option<&Selector>) -> Option<Url>
where
    R: PageRenderer + ?Sized,
{
    let Some(selector) = selector else {
        return Some(home.clone());
    };

    tracing::info!("Looking for the first page on {}", home);
    let page = match renderer.render(home).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("Failed fetch {}: {}", home, e);
            return None;
        }
    };

    let first = first_link(&page.markup, &page.final_url, selector);
    match &first {
        Some(url) => tracing::info!("First page: {}", url),
        None => tracing::warn!("No first page found on {}", home),
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::crawler::fetcher::{build_http_client, HttpRenderer};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn renderer(reject_redirects: bool) -> HttpRenderer {
        let client = build_http_client(&HttpConfig::default()).unwrap();
        HttpRenderer::new(client, reject_redirects, "PHPSESSID")
    }

    #[tokio::test]
    async fn test_home_is_first_page_without_selector() {
        let home = Url::parse("http://127.0.0.1:9/blog").unwrap();
        let first = traverse(&renderer(false), &home, None).await;
        assert_eq!(first, Some(home));
    }

    #[tokio::test]
    async fn test_first_match_is_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body>
                    <a class="post" href="/post/9">latest</a>
                    <a class="post" href="/post/8">older</a>
                </body></html>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let home = Url::parse(&format!("{}/", server.uri())).unwrap();
        let selector = Selector::parse("a.post").unwrap();
        let first = traverse(&renderer(false), &home, Some(&selector)).await.unwrap();
        assert_eq!(first.path(), "/post/9");
    }

    #[tokio::test]
    async fn test_no_match_or_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>empty</p>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/moved"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/"))
            .mount(&server)
            .await;

        let selector = Selector::parse("a.post").unwrap();

        let home = Url::parse(&format!("{}/", server.uri())).unwrap();
        assert!(traverse(&renderer(false), &home, Some(&selector)).await.is_none());

        let moved = Url::parse(&format!("{}/moved", server.uri())).unwrap();
        assert!(traverse(&renderer(true), &moved, Some(&selector)).await.is_none());
    }
}

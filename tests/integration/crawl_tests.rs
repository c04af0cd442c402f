//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl cycle end-to-end against a temporary output folder and ledger.

use blog_sync::config::{validate, Config};
use blog_sync::crawler::run_crawl;
use blog_sync::storage::read_document;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a job crawling the mock server into `<dir>/gallery`
fn create_test_config(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.job.home = format!("{}/index", server.uri());
    config.job.out = Some(dir.path().join("gallery"));
    config.job.data_file = dir.path().join("data.txt");
    config.patterns.next_pattern = Some("a.next".to_string());
    config.patterns.save_pattern = Some("img".to_string());
    config.behavior.flush_delay_ms = 10;
    validate(&config).expect("test config should be valid");
    config
}

/// Mounts a two-page blog: `/index` -> Next -> `/page2`, one image each
async fn mount_blog(server: &MockServer, page2_hits: u64, image_hits: u64) {
    Mock::given(method("GET"))
        .and(path("/index"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><head><title>Index</title></head><body>
                    <h1>Home Post</h1>
                    <img src="/img/a.jpg">
                    <a class="next" href="/page2">Next</a>
                    </body></html>"#,
                )
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><body>
                    <h1>Second Post</h1>
                    <img src="/img/b.jpg?utm_source=feed">
                    </body></html>"#,
                )
                .insert_header("content-type", "text/html"),
        )
        .expect(page2_hits)
        .mount(server)
        .await;

    for (image, body) in [("/img/a.jpg", b"AAAA"), ("/img/b.jpg", b"BBBB")] {
        Mock::given(method("GET"))
            .and(path(image))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(body.to_vec())
                    .insert_header("content-type", "image/jpeg"),
            )
            .expect(image_hits)
            .mount(server)
            .await;
    }
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn test_full_crawl_saves_assets_and_history() {
    let server = MockServer::start().await;
    mount_blog(&server, 1, 1).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir);
    config.patterns.ignore_query = vec!["utm_source".to_string()];
    let job = config.job_title();
    assert_eq!(job, "gallery");

    let summary = run_crawl(config).await.unwrap();
    assert_eq!(summary.engine.pages_rendered, 2);
    assert_eq!(summary.assets_saved, 2);

    let out = dir.path().join("gallery");
    assert_eq!(files_in(&out), vec!["a.jpg", "b.jpg"]);
    assert_eq!(std::fs::read(out.join("a.jpg")).unwrap(), b"AAAA");
    assert_eq!(std::fs::read(out.join("b.jpg")).unwrap(), b"BBBB");

    let document = read_document(&dir.path().join("data.txt")).unwrap();
    let history = &document.jobs[&job];
    let base = server.uri();
    assert_eq!(
        history.pages.keys().cloned().collect::<Vec<_>>(),
        vec![format!("{}/index", base), format!("{}/page2", base)]
    );
    assert_eq!(
        history.saves.keys().cloned().collect::<Vec<_>>(),
        vec![format!("{}/img/a.jpg", base), format!("{}/img/b.jpg", base)]
    );
}

#[tokio::test]
async fn test_second_run_downloads_nothing() {
    let server = MockServer::start().await;
    mount_blog(&server, 2, 1).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir);
    config.patterns.ignore_query = vec!["utm_source".to_string()];

    run_crawl(config.clone()).await.unwrap();
    let summary = run_crawl(config).await.unwrap();

    assert_eq!(summary.assets_saved, 0);
    assert_eq!(summary.assets_known, 2);
    assert_eq!(files_in(&dir.path().join("gallery")), vec!["a.jpg", "b.jpg"]);
}

#[tokio::test]
async fn test_stop_early_on_second_run() {
    let server = MockServer::start().await;
    mount_blog(&server, 1, 1).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir);
    config.patterns.ignore_query = vec!["utm_source".to_string()];
    config.behavior.stop_early = true;

    run_crawl(config.clone()).await.unwrap();
    let summary = run_crawl(config).await.unwrap();

    assert!(summary.stopped_early);
    assert_eq!(summary.engine.pages_rendered, 1);
    assert_eq!(summary.engine.pages_declined, 1);
}

#[tokio::test]
async fn test_ignore_history_never_writes_ledger() {
    let server = MockServer::start().await;
    mount_blog(&server, 2, 1).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir);
    config.behavior.ignore_history = true;
    config.behavior.no_revisit = true;

    run_crawl(config.clone()).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let ledger = std::fs::read_to_string(dir.path().join("data.txt")).unwrap();
    assert!(ledger.trim().is_empty());

    // No images this time; every page is new again.
    config.patterns.save_pattern = None;
    let summary = run_crawl(config).await.unwrap();
    assert_eq!(summary.engine.pages_rendered, 2);
    assert_eq!(summary.engine.pages_declined, 0);
}

#[tokio::test]
async fn test_update_data_only_records_without_saving() {
    let server = MockServer::start().await;
    mount_blog(&server, 1, 0).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir);
    config.patterns.ignore_query = vec!["utm_source".to_string()];
    config.behavior.update_data_only = true;
    let job = config.job_title();

    let summary = run_crawl(config).await.unwrap();
    assert_eq!(summary.assets_saved, 0);
    assert_eq!(summary.assets_dry_run, 2);
    assert!(files_in(&dir.path().join("gallery")).is_empty());

    let document = read_document(&dir.path().join("data.txt")).unwrap();
    assert_eq!(document.jobs[&job].save_count(), 2);
}

#[tokio::test]
async fn test_folderize_with_page_save() {
    let server = MockServer::start().await;
    mount_blog(&server, 1, 1).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir);
    config.patterns.title_pattern = Some("h1".to_string());
    config.behavior.folderize = true;
    config.behavior.save_page = true;

    run_crawl(config).await.unwrap();

    let out = dir.path().join("gallery");
    assert_eq!(files_in(&out), vec!["Home Post", "Second Post"]);
    assert_eq!(files_in(&out.join("Home Post")), vec!["Home Post.html", "a.jpg"]);
    assert_eq!(files_in(&out.join("Second Post")), vec!["Second Post.html", "b.jpg"]);
}

#[tokio::test]
async fn test_first_page_from_home_selector() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><a class="latest" href="/post/9">Latest</a></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/post/9"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"<html><body><img src="/c.png"></body></html>"#),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"PNG".to_vec())
                .insert_header("content-type", "image/png"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir);
    config.job.home = format!("{}/", server.uri());
    config.patterns.page_pattern = Some("a.latest".to_string());
    let job = config.job_title();

    let summary = run_crawl(config).await.unwrap();
    assert_eq!(summary.engine.pages_rendered, 1);
    assert_eq!(files_in(&dir.path().join("gallery")), vec!["c.png"]);

    let document = read_document(&dir.path().join("data.txt")).unwrap();
    let pages: Vec<_> = document.jobs[&job].pages.keys().cloned().collect();
    assert_eq!(
        pages,
        vec![format!("{}/", server.uri()), format!("{}/post/9", server.uri())]
    );
}

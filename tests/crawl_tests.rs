//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the news site and run the full
//! pipeline end-to-end over real HTTP.

use chrono::{NaiveDate, Utc};
use newsday_archiver::config::Config;
use newsday_archiver::crawler::Coordinator;
use newsday_archiver::output::{generate_markdown_summary, write_outputs};
use newsday_archiver::FetchErrorKind;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast, single-worker configuration pointed at the mock server
fn create_test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.site.base_url = base_url.to_string();
    config.crawler.worker_count = 1;
    config.crawler.delay_seconds = 0.0;
    config.crawler.retry_base_delay_ms = 5;
    config.crawler.request_timeout_secs = 5;
    config
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, d).expect("valid day")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body><main>{}</main></body></html>", body))
        .insert_header("content-type", "text/html")
}

fn article(title: &str, author: &str) -> ResponseTemplate {
    html(&format!(
        r#"<h1>{}</h1>
        <span class="byline">By {}</span>
        <time datetime="2020-01-05T08:00:00-04:00">January 5, 2020</time>
        <span class="category">News</span>
        <div class="entry-content"><p>Paragraph one.</p><p>Paragraph two.</p></div>
        <div class="tags"><a href="/tag/local">Local</a></div>"#,
        title, author
    ))
}

/// Mounts day one's index with two article links
async fn mount_day_one(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/2020/01/05/"))
        .respond_with(html(
            r#"<a href="/2020/01/05/coast-guard-rescues-fishermen/">Coast guard rescues fishermen</a>
               <a href="/2020/01/05/water-supply-restored-in-south/">Water supply restored in south</a>
               <a href="/about/">About this newspaper</a>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/2020/01/05/coast-guard-rescues-fishermen/"))
        .respond_with(article("Coast guard rescues fishermen", "Ana Lee"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_two_day_crawl_with_failed_index() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_day_one(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/2020/01/05/water-supply-restored-in-south/"))
        .respond_with(article("Water supply restored", "Ravi Singh"))
        .mount(&mock_server)
        .await;
    // Day two's index is not mounted, so the mock server answers 404

    let coordinator =
        Coordinator::with_http_browser(create_test_config(&base_url)).expect("valid config");
    let outcome = coordinator
        .run_days(vec![day(5), day(4)].into_iter())
        .await
        .expect("crawl runs");

    assert_eq!(outcome.store.len(), 2);
    assert_eq!(outcome.report.progress.days_failed, 1);
    assert_eq!(outcome.report.progress.articles_collected, 2);
    assert_eq!(
        outcome
            .report
            .progress
            .failures_by_kind
            .get(&FetchErrorKind::ClientError),
        Some(&1)
    );

    let url = format!("{}/2020/01/05/coast-guard-rescues-fishermen/", base_url);
    let record = outcome.store.get(&url).expect("article stored");
    assert_eq!(record.title.as_deref(), Some("Coast guard rescues fishermen"));
    assert_eq!(record.author.as_deref(), Some("Ana Lee"));
    assert_eq!(record.date.as_deref(), Some("2020-01-05T08:00:00-04:00"));
    assert_eq!(record.category.as_deref(), Some("News"));
    assert_eq!(record.tags, vec!["Local"]);
    assert_eq!(
        record.content.as_deref(),
        Some("Paragraph one.\nParagraph two.")
    );
    assert_eq!(
        record.source_url.as_deref(),
        Some(format!("{}/2020/01/05/", base_url).as_str())
    );
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_day_one(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/2020/01/05/water-supply-restored-in-south/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2020/01/05/water-supply-restored-in-south/"))
        .respond_with(article("Water supply restored", "Ravi Singh"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let coordinator =
        Coordinator::with_http_browser(create_test_config(&base_url)).expect("valid config");
    let outcome = coordinator
        .run_days(vec![day(5)].into_iter())
        .await
        .expect("crawl runs");

    assert_eq!(outcome.store.len(), 2);
    assert!(outcome.report.failures.is_empty());
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_day_one(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/2020/01/05/water-supply-restored-in-south/"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    let coordinator =
        Coordinator::with_http_browser(create_test_config(&base_url)).expect("valid config");
    let outcome = coordinator
        .run_days(vec![day(5)].into_iter())
        .await
        .expect("crawl runs");

    assert_eq!(outcome.store.len(), 1);
    assert_eq!(outcome.report.progress.articles_failed, 1);
    assert_eq!(outcome.report.failures[0].attempts, 1);
}

#[tokio::test]
async fn test_unrendered_page_fails_after_three_attempts() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/2020/01/05/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><div id="app"></div></body></html>"#)
                .insert_header("content-type", "text/html"),
        )
        .expect(3)
        .mount(&mock_server)
        .await;

    let coordinator =
        Coordinator::with_http_browser(create_test_config(&base_url)).expect("valid config");
    let outcome = coordinator
        .run_days(vec![day(5)].into_iter())
        .await
        .expect("crawl runs");

    assert!(outcome.store.is_empty());
    assert_eq!(outcome.report.progress.days_failed, 1);
    assert_eq!(outcome.report.failures[0].attempts, 3);
    assert_eq!(
        outcome.report.failures[0].error.kind(),
        FetchErrorKind::Render
    );
}

#[tokio::test]
async fn test_exports_written_after_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_day_one(&mock_server).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = create_test_config(&base_url);
    config.output.directory = temp_dir.path().to_string_lossy().into_owned();
    config.output.formats = vec!["json".into(), "jsonl".into(), "sqlite".into(), "csv".into()];
    let output = config.output.clone();

    let coordinator = Coordinator::with_http_browser(config).expect("valid config");
    let outcome = coordinator
        .run_days(vec![day(5)].into_iter())
        .await
        .expect("crawl runs");

    let records = outcome.store.export();
    let written = write_outputs(&records, &output, Utc::now()).expect("outputs written");
    assert_eq!(written.len(), 4);

    let csv = std::fs::read_to_string(&written[3]).expect("csv readable");
    assert!(csv.starts_with("title,content,author,date,category,url,crawl_date,source_url,tags"));
    assert!(csv.contains("Coast guard rescues fishermen"));

    let json = std::fs::read_to_string(&written[0]).expect("json readable");
    let parsed: Vec<newsday_archiver::ArticleRecord> =
        serde_json::from_str(&json).expect("json parses");
    assert_eq!(parsed, records);

    let summary = temp_dir.path().join("summary.md");
    generate_markdown_summary(&outcome.report, &written, &summary).expect("summary written");
    let text = std::fs::read_to_string(&summary).expect("summary readable");
    assert!(text.contains("| Articles collected | 1 |"));
    assert!(text.contains("| Articles failed | 1 |"));
}

// Tests for scan orchestration

use deadlink_core::scan::{ScanOptions, execute_scan, extract_url_path};
use deadlink_scanner::{LinkStatus, RequesterId, ScanConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> ScanConfig {
    ScanConfig::default()
        .with_max_workers(4)
        .with_scan_deadline(Duration::from_secs(10))
        .with_request_timeout(Duration::from_secs(2))
}

fn options(urls: Vec<String>) -> ScanOptions {
    ScanOptions {
        urls,
        requester: RequesterId::new("tester"),
        config: test_config(),
        show_progress_bars: false,
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html; charset=utf-8")
}

// ============================================================================
// URL Path Extraction Tests
// ============================================================================

#[test]
fn test_extract_url_path_root() {
    assert_eq!(extract_url_path("http://example.com/"), "/");
}

#[test]
fn test_extract_url_path_empty_path() {
    assert_eq!(extract_url_path("http://example.com"), "/");
}

#[test]
fn test_extract_url_path_nested() {
    assert_eq!(extract_url_path("http://example.com/docs/v1/intro"), "/docs/v1/intro");
}

#[test]
fn test_extract_url_path_with_query_and_fragment() {
    assert_eq!(extract_url_path("http://example.com/page?key=value#top"), "/page");
}

#[test]
fn test_extract_url_path_with_port() {
    assert_eq!(extract_url_path("http://example.com:8080/page"), "/page");
}

#[test]
fn test_extract_url_path_with_trailing_slash() {
    assert_eq!(extract_url_path("http://example.com/docs/"), "/docs/");
}

#[test]
fn test_extract_url_path_invalid_url() {
    assert_eq!(extract_url_path("not a url"), "not a url");
}

// ============================================================================
// Scan Execution Tests
// ============================================================================

#[tokio::test]
async fn test_execute_scan_requires_urls() {
    let result = execute_scan(options(vec![]), None, None).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_execute_scan_single_site() {
    let server = MockServer::start().await;
    Mock::given(path("/"))
        .respond_with(html(r#"<a href="/ok">ok</a><a href="/gone">gone</a>"#))
        .mount(&server)
        .await;
    Mock::given(path("/ok"))
        .respond_with(html("<p>fine</p>"))
        .mount(&server)
        .await;
    Mock::given(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let results = execute_scan(options(vec![server.uri()]), None, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.requester.as_str(), "tester");
    assert_eq!(result.len(), 3);

    let gone = result.get(&format!("{}/gone", server.uri())).unwrap();
    assert_eq!(gone.status, LinkStatus::NotFound);
    assert_eq!(result.broken().count(), 1);
}

#[tokio::test]
async fn test_execute_scan_skips_invalid_seed() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(html("<p>no links</p>"))
        .mount(&server)
        .await;

    let messages = Arc::new(Mutex::new(Vec::new()));
    let messages_clone = messages.clone();
    let progress = Arc::new(move |msg: String| {
        messages_clone.lock().unwrap().push(msg);
    });

    let results = execute_scan(
        options(vec!["not a url".to_string(), server.uri()]),
        Some(progress),
        None,
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 1);
    let messages = messages.lock().unwrap();
    assert!(messages.iter().any(|m| m.contains("Failed to scan not a url")));
    assert!(messages.iter().any(|m| m.contains("Scanning site 2/2")));
}

#[tokio::test]
async fn test_execute_scan_result_callback_per_site() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    for server in [&first, &second] {
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .respond_with(html("<p>leaf</p>"))
            .mount(server)
            .await;
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let on_result = Arc::new(move |result: &deadlink_scanner::ScanResult| {
        seen_clone.lock().unwrap().push(result.seed_url.clone());
    });

    let results = execute_scan(
        options(vec![first.uri(), second.uri()]),
        None,
        Some(on_result),
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 2);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].starts_with(&first.uri()));
    assert!(seen[1].starts_with(&second.uri()));
}

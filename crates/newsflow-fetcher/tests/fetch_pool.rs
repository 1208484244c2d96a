//! Integration tests for the concurrent fetch pool.
//!
//! Uses `wiremock` to stand up a local HTTP server for each test so no
//! real network traffic is made. Covers partition isolation (a failing
//! source never blocks the others), retry behavior, and ordering.

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use newsflow_core::Language;
use newsflow_fetcher::{fetch_all_sources, fetch_feed, FetchError, FetchOptions, FetchSource};

fn rss_body(title: &str, link: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item>
    <title>{title}</title>
    <link>{link}</link>
    <guid>{link}</guid>
  </item>
</channel></rss>"#
    )
}

fn source(id: i64, slug: &str, url: String, language: Language) -> FetchSource {
    FetchSource {
        id,
        slug: slug.to_string(),
        feed_url: url,
        language,
        priority: 100,
    }
}

fn no_retry() -> FetchOptions {
    FetchOptions {
        concurrency: 4,
        max_retries: 0,
        backoff_base_ms: 0,
    }
}

// ---------------------------------------------------------------------------
// fetch_feed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_feed_parses_items_from_server() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(rss_body("Hello", "https://x.example/a")),
        )
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let items = fetch_feed(&client, &format!("{}/feed.xml", server.uri()))
        .await
        .expect("expected Ok for valid feed");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Hello");
}

#[tokio::test]
async fn fetch_feed_surfaces_http_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let err = fetch_feed(&client, &format!("{}/feed.xml", server.uri()))
        .await
        .expect_err("expected Err for 503");

    assert!(matches!(err, FetchError::Status(503)));
    assert!(err.is_retriable());
}

// ---------------------------------------------------------------------------
// fetch_all_sources – isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_source_never_blocks_the_others() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/good.xml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(rss_body("Good", "https://x.example/good")),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    // The slow feed answers after 2 seconds; the pass must still finish
    // with the good feed's items collected.
    Mock::given(method("GET"))
        .and(path("/slow.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_string(rss_body("Slow", "https://x.example/slow")),
        )
        .mount(&server)
        .await;

    let sources = vec![
        source(1, "good", format!("{}/good.xml", server.uri()), Language::En),
        source(
            2,
            "broken",
            format!("{}/broken.xml", server.uri()),
            Language::En,
        ),
        source(3, "slow", format!("{}/slow.xml", server.uri()), Language::Si),
    ];

    let client = reqwest::Client::new();
    let report = fetch_all_sources(&client, sources, no_retry()).await;

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.total_items(), 2);

    let good = report.results.iter().find(|r| r.slug == "good").unwrap();
    assert!(good.success);
    assert_eq!(good.items.len(), 1);

    let broken = report.results.iter().find(|r| r.slug == "broken").unwrap();
    assert!(!broken.success);
    assert!(broken.items.is_empty());
    assert!(
        broken.error.as_deref().unwrap_or("").contains("404"),
        "error should carry the status, got: {:?}",
        broken.error
    );

    let slow = report.results.iter().find(|r| r.slug == "slow").unwrap();
    assert!(slow.success, "slow-but-healthy source must still succeed");
}

#[tokio::test]
async fn stats_are_grouped_by_language() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(rss_body("A", "https://x.example/a")),
        )
        .mount(&server)
        .await;

    let sources = vec![
        source(1, "en-1", format!("{}/a.xml", server.uri()), Language::En),
        source(2, "en-2", format!("{}/b.xml", server.uri()), Language::En),
        source(3, "ta-1", format!("{}/c.xml", server.uri()), Language::Ta),
    ];

    let client = reqwest::Client::new();
    let report = fetch_all_sources(&client, sources, no_retry()).await;

    let en = report
        .stats
        .iter()
        .find(|s| s.language == Language::En)
        .expect("en partition should have stats");
    assert_eq!(en.total, 2);
    assert_eq!(en.succeeded, 2);

    let ta = report
        .stats
        .iter()
        .find(|s| s.language == Language::Ta)
        .expect("ta partition should have stats");
    assert_eq!(ta.total, 1);

    assert!(
        !report.stats.iter().any(|s| s.language == Language::Si),
        "no si sources, no si stats"
    );
}

// ---------------------------------------------------------------------------
// fetch_all_sources – retries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transient_server_error_is_retried_and_recovers() {
    let server = MockServer::start().await;

    // First request returns 503 (served once), the retry gets a 200.
    Mock::given(method("GET"))
        .and(path("/flaky.xml"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(rss_body("Recovered", "https://x.example/r")),
        )
        .mount(&server)
        .await;

    let sources = vec![source(
        1,
        "flaky",
        format!("{}/flaky.xml", server.uri()),
        Language::En,
    )];

    let options = FetchOptions {
        concurrency: 2,
        max_retries: 1,
        backoff_base_ms: 1,
    };
    let client = reqwest::Client::new();
    let report = fetch_all_sources(&client, sources, options).await;

    assert_eq!(report.total_items(), 1);
    assert!(report.results[0].success, "expected recovery after retry");
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone.xml"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1) // exactly one attempt, no retries for 4xx
        .mount(&server)
        .await;

    let sources = vec![source(
        1,
        "gone",
        format!("{}/gone.xml", server.uri()),
        Language::En,
    )];

    let options = FetchOptions {
        concurrency: 2,
        max_retries: 3,
        backoff_base_ms: 1,
    };
    let client = reqwest::Client::new();
    let report = fetch_all_sources(&client, sources, options).await;

    assert!(!report.results[0].success);
}

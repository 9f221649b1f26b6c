//! End-to-end ingestion tests: subscribe, refresh, conditional fetch,
//! crawler mode, duplicate guards, and worker-pool backpressure.
//!
//! Each test runs against its own in-memory SQLite database and a wiremock
//! HTTP server standing in for the remote feed. Feed bodies point their
//! site link at the mock server so icon discovery stays local (it gets fast
//! 404s for paths no mock covers).

use std::time::Duration;

use pretty_assertions::assert_eq;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use weir::fetch::FeedFetcher;
use weir::model::{Job, SchedulingPolicy};
use weir::reader::handler::{self, FeedCreationRequest, FeedHandlerError};
use weir::storage::Database;
use weir::worker::Pool;

const FIXED_POLICY: SchedulingPolicy = SchedulingPolicy::Fixed {
    interval_minutes: 60,
};

async fn test_db() -> (Database, i64) {
    let db = Database::open(":memory:").await.unwrap();
    let category_id = db.create_category(1, "News").await.unwrap();
    (db, category_id)
}

fn creation_request(category_id: i64, url: &str) -> FeedCreationRequest {
    FeedCreationRequest {
        category_id,
        feed_url: url.to_string(),
        ..Default::default()
    }
}

/// A minimal RSS body whose site link points back at the mock server.
fn rss_body(site: &str, items: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Example</title>
  <link>{}/</link>
  {}
</channel></rss>"#,
        site, items
    )
}

// ============================================================================
// Subscription
// ============================================================================

#[tokio::test]
async fn test_create_feed_end_to_end_with_missing_pubdate() {
    // One item carries a pubDate, the other does not; the undated entry must
    // be stamped "now" and both must carry distinct non-empty hashes.
    let server = MockServer::start().await;
    let body = rss_body(
        &server.uri(),
        r#"<item>
    <guid>item-1</guid><title>Dated</title>
    <link>https://example.org/1</link>
    <pubDate>Tue, 03 Jun 2003 09:39:21 GMT</pubDate>
  </item>
  <item>
    <guid>item-2</guid><title>Undated</title>
    <link>https://example.org/2</link>
  </item>"#,
    );
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let (db, category_id) = test_db().await;
    let fetcher = FeedFetcher::with_defaults().unwrap();

    let before = chrono::Utc::now();
    let feed = handler::create_feed(
        &db,
        &fetcher,
        1,
        &creation_request(category_id, &format!("{}/feed.xml", server.uri())),
    )
    .await
    .unwrap();
    let after = chrono::Utc::now();

    assert_eq!(feed.title, "Example");
    assert_eq!(feed.site_url, format!("{}/", server.uri()));
    assert_eq!(feed.feed_url, format!("{}/feed.xml", server.uri()));

    let entries = db.entries_for_feed(feed.id).await.unwrap();
    assert_eq!(entries.len(), 2);

    let undated = entries.iter().find(|e| e.title == "Undated").unwrap();
    assert!(undated.date >= before - chrono::Duration::seconds(1));
    assert!(undated.date <= after + chrono::Duration::seconds(1));

    let dated = entries.iter().find(|e| e.title == "Dated").unwrap();
    assert_eq!(dated.date.to_rfc3339(), "2003-06-03T09:39:21+00:00");

    assert!(!entries[0].hash.is_empty());
    assert!(!entries[1].hash.is_empty());
    assert_ne!(entries[0].hash, entries[1].hash);
}

#[tokio::test]
async fn test_create_feed_unknown_category_rejected_before_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0) // category validation must short-circuit the fetch
        .mount(&server)
        .await;

    let (db, _) = test_db().await;
    let fetcher = FeedFetcher::with_defaults().unwrap();

    let err = handler::create_feed(
        &db,
        &fetcher,
        1,
        &creation_request(999, &format!("{}/feed.xml", server.uri())),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, FeedHandlerError::CategoryNotFound));
}

#[tokio::test]
async fn test_duplicate_subscription_detected_post_redirect() {
    let server = MockServer::start().await;
    let body = rss_body(&server.uri(), "");
    Mock::given(method("GET"))
        .and(path("/canonical.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    // The old URL now redirects onto the canonical one.
    Mock::given(method("GET"))
        .and(path("/old.xml"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", "/canonical.xml".to_string()),
        )
        .mount(&server)
        .await;

    let (db, category_id) = test_db().await;
    let fetcher = FeedFetcher::with_defaults().unwrap();

    handler::create_feed(
        &db,
        &fetcher,
        1,
        &creation_request(category_id, &format!("{}/canonical.xml", server.uri())),
    )
    .await
    .unwrap();

    // Subscribing to the redirecting URL resolves to the same effective URL.
    let err = handler::create_feed(
        &db,
        &fetcher,
        1,
        &creation_request(category_id, &format!("{}/old.xml", server.uri())),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, FeedHandlerError::Duplicate(_)));
}

// ============================================================================
// Refresh
// ============================================================================

#[tokio::test]
async fn test_conditional_fetch_short_circuits_parsing() {
    let server = MockServer::start().await;
    let body = rss_body(
        &server.uri(),
        r#"<item><guid>a</guid><title>First</title></item>"#,
    );
    // Creation response carries a validator and is consumed exactly once.
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("ETag", "\"v1\""),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // The refresh must send the stored validator back; the body it would
    // get is intentionally broken; it must never be parsed.
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .and(header("If-None-Match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304).set_body_string("<broken"))
        .mount(&server)
        .await;

    let (db, category_id) = test_db().await;
    let fetcher = FeedFetcher::with_defaults().unwrap();
    let feed = handler::create_feed(
        &db,
        &fetcher,
        1,
        &creation_request(category_id, &format!("{}/feed.xml", server.uri())),
    )
    .await
    .unwrap();

    handler::refresh_feed(&db, &fetcher, &FIXED_POLICY, 1, feed.id)
        .await
        .unwrap();

    // Entries untouched, checked_at stamped, no error recorded.
    let entries = db.entries_for_feed(feed.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "First");

    let reloaded = db.feed_by_id(1, feed.id).await.unwrap().unwrap();
    assert!(reloaded.checked_at.is_some());
    assert_eq!(reloaded.parsing_error_count, 0);
    // Validators survive the 304 untouched.
    assert_eq!(reloaded.etag_header, "\"v1\"");
}

#[tokio::test]
async fn test_refresh_merges_new_entries_and_refreshes_known_ones() {
    let server = MockServer::start().await;
    let first = rss_body(
        &server.uri(),
        r#"<item><guid>a</guid><title>Original title</title></item>"#,
    );
    let second = rss_body(
        &server.uri(),
        r#"<item><guid>a</guid><title>Updated title</title></item>
  <item><guid>b</guid><title>Brand new</title></item>"#,
    );
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(first))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(second))
        .mount(&server)
        .await;

    let (db, category_id) = test_db().await;
    let fetcher = FeedFetcher::with_defaults().unwrap();
    let feed = handler::create_feed(
        &db,
        &fetcher,
        1,
        &creation_request(category_id, &format!("{}/feed.xml", server.uri())),
    )
    .await
    .unwrap();

    handler::refresh_feed(&db, &fetcher, &FIXED_POLICY, 1, feed.id)
        .await
        .unwrap();

    let entries = db.entries_for_feed(feed.id).await.unwrap();
    assert_eq!(entries.len(), 2);
    let known = entries
        .iter()
        .find(|e| e.hash == weir::reader::identity::hash_value("a"))
        .unwrap();
    assert_eq!(known.title, "Updated title");
}

#[tokio::test]
async fn test_crawler_mode_does_not_overwrite_existing_entries() {
    let server = MockServer::start().await;
    let first = rss_body(
        &server.uri(),
        r#"<item><guid>a</guid><title>Extracted title</title></item>"#,
    );
    let second = rss_body(
        &server.uri(),
        r#"<item><guid>a</guid><title>Feed summary title</title></item>"#,
    );
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(first))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(second))
        .mount(&server)
        .await;

    let (db, category_id) = test_db().await;
    let fetcher = FeedFetcher::with_defaults().unwrap();
    let mut request = creation_request(category_id, &format!("{}/feed.xml", server.uri()));
    request.crawler = true;
    let feed = handler::create_feed(&db, &fetcher, 1, &request).await.unwrap();

    handler::refresh_feed(&db, &fetcher, &FIXED_POLICY, 1, feed.id)
        .await
        .unwrap();

    // Same hash, crawler enabled: the stored entry must keep its content.
    let entries = db.entries_for_feed(feed.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "Extracted title");
}

#[tokio::test]
async fn test_refresh_error_bookkeeping_and_recovery() {
    let server = MockServer::start().await;
    let body = rss_body(&server.uri(), "");
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // One 404, then healthy again.
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let (db, category_id) = test_db().await;
    let fetcher = FeedFetcher::with_defaults().unwrap();
    let feed = handler::create_feed(
        &db,
        &fetcher,
        1,
        &creation_request(category_id, &format!("{}/feed.xml", server.uri())),
    )
    .await
    .unwrap();

    let err = handler::refresh_feed(&db, &fetcher, &FIXED_POLICY, 1, feed.id)
        .await
        .unwrap_err();
    assert!(matches!(err, FeedHandlerError::Fetch(_)));

    let broken = db.feed_by_id(1, feed.id).await.unwrap().unwrap();
    assert_eq!(broken.parsing_error_count, 1);
    assert!(!broken.parsing_error_message.is_empty());

    handler::refresh_feed(&db, &fetcher, &FIXED_POLICY, 1, feed.id)
        .await
        .unwrap();
    let recovered = db.feed_by_id(1, feed.id).await.unwrap().unwrap();
    assert_eq!(recovered.parsing_error_count, 0);
    assert!(recovered.parsing_error_message.is_empty());
}

#[tokio::test]
async fn test_refresh_schedules_next_check() {
    let server = MockServer::start().await;
    let body = rss_body(&server.uri(), "");
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let (db, category_id) = test_db().await;
    let fetcher = FeedFetcher::with_defaults().unwrap();
    let feed = handler::create_feed(
        &db,
        &fetcher,
        1,
        &creation_request(category_id, &format!("{}/feed.xml", server.uri())),
    )
    .await
    .unwrap();

    handler::refresh_feed(&db, &fetcher, &FIXED_POLICY, 1, feed.id)
        .await
        .unwrap();

    let reloaded = db.feed_by_id(1, feed.id).await.unwrap().unwrap();
    let next_check = reloaded.next_check_at.unwrap();
    assert!(next_check > chrono::Utc::now() + chrono::Duration::minutes(55));
    assert!(next_check < chrono::Utc::now() + chrono::Duration::minutes(65));
}

// ============================================================================
// Worker pool
// ============================================================================

#[tokio::test]
async fn test_pool_backpressure_blocks_producer_without_dropping_jobs() {
    let server = MockServer::start().await;
    let body = rss_body(
        &server.uri(),
        r#"<item><guid>a</guid><title>A</title></item>"#,
    );
    Mock::given(method("GET"))
        .and(path_regex(r"^/feed-\d+\.xml$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                // Slow enough that a single worker cannot drain four jobs
                // before the push-timeout check below.
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let (db, category_id) = test_db().await;
    let fetcher = FeedFetcher::with_defaults().unwrap();

    let mut jobs = Vec::new();
    for i in 0..4 {
        let feed = handler::create_feed(
            &db,
            &fetcher,
            1,
            &creation_request(category_id, &format!("{}/feed-{}.xml", server.uri(), i)),
        )
        .await
        .unwrap();
        jobs.push(Job {
            user_id: 1,
            feed_id: feed.id,
        });
    }

    let pool = Pool::spawn(1, db.clone(), fetcher, FIXED_POLICY);

    // With one worker and a capacity-1 channel, pushing four slow jobs
    // cannot complete immediately: the producer must block.
    let push = pool.push(jobs.clone());
    let blocked = tokio::time::timeout(Duration::from_millis(100), push).await;
    assert!(blocked.is_err(), "push should block while the pool is busy");

    // Pushing with a generous timeout drains everything; nothing is lost.
    tokio::time::timeout(Duration::from_secs(30), pool.push(jobs))
        .await
        .expect("all jobs must eventually be accepted");
}

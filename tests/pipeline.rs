//! End-to-end pipeline tests: mock feed server, in-memory notifier,
//! ledger in a temp directory.
//!
//! Each test wires its own pipeline so the delivery ledger and the notifier
//! call log are fully isolated.

use async_trait::async_trait;
use herald::deliver::DeliveryReport;
use herald::ledger::Ledger;
use herald::notify::{Notifier, NotifyError};
use herald::pipeline::{Outcome, Pipeline};
use herald::Article;
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{any, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED_TWO_ENTRIES: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Blog</title>
  <entry>
    <id>urn:post:newer</id>
    <title>Newer Post</title>
    <link href="https://example.org/newer"/>
    <summary>Second article</summary>
    <published>2024-01-15T09:00:00Z</published>
    <updated>2024-01-15T09:00:00Z</updated>
  </entry>
  <entry>
    <id>urn:post:older</id>
    <title>Older Post</title>
    <link href="https://example.org/older"/>
    <summary>First article</summary>
    <published>2024-01-14T09:00:00Z</published>
    <updated>2024-01-14T09:00:00Z</updated>
  </entry>
</feed>"#;

const FEED_THREE_ENTRIES: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Blog</title>
  <entry>
    <id>urn:post:c</id><title>C</title>
    <published>2024-01-15T09:00:00Z</published><updated>2024-01-15T09:00:00Z</updated>
  </entry>
  <entry>
    <id>urn:post:b</id><title>B</title>
    <published>2024-01-14T09:00:00Z</published><updated>2024-01-14T09:00:00Z</updated>
  </entry>
  <entry>
    <id>urn:post:a</id><title>A</title>
    <published>2024-01-10T09:00:00Z</published><updated>2024-01-10T09:00:00Z</updated>
  </entry>
</feed>"#;

/// Records delivered ids in order; fails for ids in `failing`.
#[derive(Clone, Default)]
struct MemoryNotifier {
    sent: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl MemoryNotifier {
    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    fn fail_for(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, article: &Article) -> Result<(), NotifyError> {
        if self.failing.lock().unwrap().contains(&article.id) {
            return Err(NotifyError::Status(500));
        }
        self.sent.lock().unwrap().push(article.id.clone());
        Ok(())
    }
}

async fn serve_feed(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

fn pipeline(
    feed_url: &str,
    data_dir: &TempDir,
    notifier: MemoryNotifier,
) -> Pipeline<MemoryNotifier> {
    Pipeline::new(
        reqwest::Client::new(),
        feed_url.to_string(),
        Ledger::new(data_dir.path()),
        notifier,
    )
    .with_spacing(Duration::ZERO)
}

fn completed(outcome: Outcome) -> DeliveryReport {
    match outcome {
        Outcome::Completed(report) => report,
        other => panic!("Expected Completed, got {:?}", other),
    }
}

// ============================================================================
// First run and idempotence
// ============================================================================

#[tokio::test]
async fn test_first_run_delivers_oldest_first_and_records_both() {
    let server = serve_feed(FEED_TWO_ENTRIES).await;
    let dir = TempDir::new().unwrap();
    let notifier = MemoryNotifier::default();
    let pipeline = pipeline(&server.uri(), &dir, notifier.clone());

    let report = completed(pipeline.run_full_check().await);

    assert_eq!(report.attempted, 2);
    assert_eq!(notifier.sent(), vec!["urn:post:older", "urn:post:newer"]);

    let ledger = Ledger::new(dir.path()).load();
    assert!(ledger.contains("urn:post:older"));
    assert!(ledger.contains("urn:post:newer"));
}

#[tokio::test]
async fn test_second_run_with_unchanged_feed_delivers_nothing() {
    let server = serve_feed(FEED_TWO_ENTRIES).await;
    let dir = TempDir::new().unwrap();
    let notifier = MemoryNotifier::default();
    let pipeline = pipeline(&server.uri(), &dir, notifier.clone());

    completed(pipeline.run_full_check().await);
    let ledger_before =
        std::fs::read_to_string(dir.path().join("delivered.json")).unwrap();

    let report = completed(pipeline.run_full_check().await);

    assert_eq!(report.attempted, 0);
    assert_eq!(notifier.sent().len(), 2); // Nothing new was sent
    // Zero ledger writes on the second invocation
    let ledger_after =
        std::fs::read_to_string(dir.path().join("delivered.json")).unwrap();
    assert_eq!(ledger_before, ledger_after);
}

#[tokio::test]
async fn test_ledger_survives_pipeline_restart() {
    let server = serve_feed(FEED_TWO_ENTRIES).await;
    let dir = TempDir::new().unwrap();

    let first = MemoryNotifier::default();
    completed(pipeline(&server.uri(), &dir, first.clone()).run_full_check().await);
    assert_eq!(first.sent().len(), 2);

    // A brand-new pipeline over the same data dir sees the persisted ledger
    let second = MemoryNotifier::default();
    let report = completed(pipeline(&server.uri(), &dir, second.clone()).run_full_check().await);
    assert_eq!(report.attempted, 0);
    assert!(second.sent().is_empty());
}

// ============================================================================
// Capped initial sync
// ============================================================================

#[tokio::test]
async fn test_initial_sync_cap_delivers_two_most_recent() {
    let server = serve_feed(FEED_THREE_ENTRIES).await;
    let dir = TempDir::new().unwrap();
    let notifier = MemoryNotifier::default();
    let pipeline = pipeline(&server.uri(), &dir, notifier.clone());

    let report = completed(pipeline.run_initial_sync(2).await);

    assert_eq!(report.attempted, 2);
    // The two most recent, still delivered oldest first
    assert_eq!(notifier.sent(), vec!["urn:post:b", "urn:post:c"]);

    // The skipped backlog article is not in the ledger
    let ledger = Ledger::new(dir.path()).load();
    assert!(!ledger.contains("urn:post:a"));
}

// ============================================================================
// Partial failure isolation
// ============================================================================

#[tokio::test]
async fn test_failed_delivery_commits_only_successes_and_retries_later() {
    let server = serve_feed(FEED_THREE_ENTRIES).await;
    let dir = TempDir::new().unwrap();
    let notifier = MemoryNotifier::default();
    notifier.fail_for("urn:post:b");
    let pipeline = pipeline(&server.uri(), &dir, notifier.clone());

    let report = completed(pipeline.run_full_check().await);

    // b failed but a and c were still attempted and delivered
    assert_eq!(report.attempted, 3);
    assert_eq!(report.delivered, vec!["urn:post:a", "urn:post:c"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id, "urn:post:b");

    let ledger = Ledger::new(dir.path()).load();
    assert!(ledger.contains("urn:post:a"));
    assert!(ledger.contains("urn:post:c"));
    assert!(!ledger.contains("urn:post:b"));

    // Next invocation retries exactly the failed article
    notifier.clear_failures();
    let report = completed(pipeline.run_full_check().await);
    assert_eq!(report.delivered, vec!["urn:post:b"]);
    assert!(Ledger::new(dir.path()).load().contains("urn:post:b"));
}

// ============================================================================
// Fetch resilience and invocation-fatal errors
// ============================================================================

#[tokio::test]
async fn test_fetch_recovers_on_third_attempt() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_TWO_ENTRIES))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let notifier = MemoryNotifier::default();
    let pipeline = pipeline(&server.uri(), &dir, notifier.clone());

    let report = completed(pipeline.run_full_check().await);
    assert_eq!(report.delivered.len(), 2);
}

#[tokio::test]
async fn test_fetch_exhaustion_aborts_without_ledger_write() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let notifier = MemoryNotifier::default();
    let pipeline = pipeline(&server.uri(), &dir, notifier.clone());

    assert!(matches!(pipeline.run_full_check().await, Outcome::Aborted));
    assert!(notifier.sent().is_empty());
    // Aborted before the ledger stage: no file was created
    assert!(!dir.path().join("delivered.json").exists());
}

#[tokio::test]
async fn test_malformed_feed_aborts_without_ledger_write() {
    let server = serve_feed("<not a feed at all").await;
    let dir = TempDir::new().unwrap();
    let notifier = MemoryNotifier::default();
    let pipeline = pipeline(&server.uri(), &dir, notifier.clone());

    assert!(matches!(pipeline.run_full_check().await, Outcome::Aborted));
    assert!(notifier.sent().is_empty());
    assert!(!dir.path().join("delivered.json").exists());
}

#[tokio::test]
async fn test_ledger_commit_failure_aborts_after_deliveries() {
    let server = serve_feed(FEED_TWO_ENTRIES).await;
    let dir = TempDir::new().unwrap();
    // A regular file sits where the data directory should be, so every
    // ledger write fails
    let blocked = dir.path().join("blocked");
    std::fs::write(&blocked, "not a directory").unwrap();

    let notifier = MemoryNotifier::default();
    let pipeline = Pipeline::new(
        reqwest::Client::new(),
        server.uri(),
        Ledger::new(&blocked),
        notifier.clone(),
    )
    .with_spacing(Duration::ZERO);

    let outcome = pipeline.run_full_check().await;

    // The invocation fails, but the deliveries already sent are not undone
    assert!(matches!(outcome, Outcome::Aborted));
    assert_eq!(notifier.sent().len(), 2);
}

#[tokio::test]
async fn test_empty_feed_invocation_still_prunes_ledger() {
    const EMPTY_FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"><title>Quiet Blog</title></feed>"#;

    let server = serve_feed(EMPTY_FEED).await;
    let dir = TempDir::new().unwrap();
    let expired = chrono::Utc::now() - chrono::Duration::days(45);
    let json = serde_json::json!([
        { "id": "urn:post:expired", "delivered_at": expired.to_rfc3339() },
        { "id": "urn:post:fresh", "delivered_at": chrono::Utc::now().to_rfc3339() },
    ]);
    std::fs::write(dir.path().join("delivered.json"), json.to_string()).unwrap();

    let notifier = MemoryNotifier::default();
    let report = completed(
        pipeline(&server.uri(), &dir, notifier.clone())
            .run_full_check()
            .await,
    );

    assert_eq!(report.attempted, 0);
    assert!(notifier.sent().is_empty());
    // Retention pruning ran even though the feed had no entries
    let content = std::fs::read_to_string(dir.path().join("delivered.json")).unwrap();
    assert!(!content.contains("urn:post:expired"));
    assert!(content.contains("urn:post:fresh"));
}

// ============================================================================
// Single-flight guard
// ============================================================================

#[tokio::test]
async fn test_overlapping_invocations_are_rejected() {
    let server = serve_feed(FEED_TWO_ENTRIES).await;
    let dir = TempDir::new().unwrap();
    let notifier = MemoryNotifier::default();
    let pipeline = pipeline(&server.uri(), &dir, notifier.clone());

    let (first, second) = tokio::join!(pipeline.run_full_check(), pipeline.run_full_check());

    let busy_count = [&first, &second]
        .iter()
        .filter(|o| matches!(o, Outcome::Busy))
        .count();
    assert_eq!(busy_count, 1, "exactly one trigger must be dropped");
    // The surviving invocation delivered both articles exactly once
    assert_eq!(notifier.sent().len(), 2);
}

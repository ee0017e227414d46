//! Integration tests for the harvest pipeline
//!
//! These tests use wiremock for the remote side and a real SQLite file (or an
//! in-memory store) for the local side, and drive whole runs end-to-end.

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sumi_harvest::config::{Config, FetcherConfig};
use sumi_harvest::harvest::{
    run_harvest, Dispatcher, FetchedPage, Fetcher, HarvestContext, PipelineSettings, RetryPolicy,
};
use sumi_harvest::storage::{Record, SqliteStorage, Storage, StorageError, StorageResult};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at files inside `dir`
fn create_test_config(dir: &TempDir, concurrency: usize, max_retries: u32) -> Config {
    let mut config = Config::default();
    config.harvest.concurrency = concurrency;
    config.harvest.max_retries = max_retries;
    config.harvest.retry_delay_ms = 1;
    config.fetcher.user_agent_name = "TestBot".to_string();
    config.fetcher.request_timeout_secs = Some(5);
    config.input.urls_path = dir.path().join("urls.txt").display().to_string();
    config.output.database_path = dir.path().join("urls.db").display().to_string();
    config
}

fn write_urls(config: &Config, urls: &[String]) {
    let mut contents = urls.join("\n");
    contents.push('\n');
    std::fs::write(&config.input.urls_path, contents).unwrap();
}

fn open_db(config: &Config) -> SqliteStorage {
    SqliteStorage::new(Path::new(&config.output.database_path)).unwrap()
}

fn dispatcher(storage: Arc<dyn Storage>, concurrency: usize, max_retries: u32) -> Dispatcher {
    Dispatcher::new(HarvestContext::new(
        storage,
        Fetcher::new(&FetcherConfig::default()).unwrap(),
        RetryPolicy::fixed(max_retries, Duration::from_millis(1)),
        PipelineSettings::with_concurrency(concurrency),
    ))
}

fn input(urls: &[String]) -> Cursor<Vec<u8>> {
    Cursor::new(urls.join("\n").into_bytes())
}

/// Store whose first `failures` saves fail with a transient error
struct FlakyStorage {
    inner: SqliteStorage,
    failures: u32,
    save_calls: AtomicU32,
}

impl FlakyStorage {
    fn new(failures: u32) -> Self {
        Self {
            inner: SqliteStorage::new_in_memory().unwrap(),
            failures,
            save_calls: AtomicU32::new(0),
        }
    }

    fn save_calls(&self) -> u32 {
        self.save_calls.load(Ordering::SeqCst)
    }
}

impl Storage for FlakyStorage {
    fn exists(&self, url: &str) -> StorageResult<bool> {
        self.inner.exists(url)
    }

    fn save(&self, page: &FetchedPage) -> StorageResult<()> {
        let call = self.save_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(StorageError::Database("database is locked".to_string()));
        }
        self.inner.save(page)
    }

    fn get_record(&self, url: &str) -> StorageResult<Option<Record>> {
        self.inner.get_record(url)
    }

    fn count_records(&self) -> StorageResult<u64> {
        self.inner.count_records()
    }

    fn total_content_bytes(&self) -> StorageResult<u64> {
        self.inner.total_content_bytes()
    }

    fn status_breakdown(&self) -> StorageResult<Vec<(Option<u16>, u64)>> {
        self.inner.status_breakdown()
    }
}

#[tokio::test]
async fn test_end_to_end_two_urls() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("alpha"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(200).set_body_string("bravo"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, 2, 1);
    let a = format!("{}/a", mock_server.uri());
    let b = format!("{}/b", mock_server.uri());
    write_urls(&config, &[a.clone(), b.clone()]);

    let summary = run_harvest(&config).await.expect("Harvest should succeed");

    assert_eq!(summary.enqueued, 2);
    assert_eq!(summary.saved, 2);
    assert_eq!(summary.failed(), 0);

    let storage = open_db(&config);
    assert_eq!(storage.count_records().unwrap(), 2);
    assert_eq!(storage.get_record(&a).unwrap().unwrap().content, b"alpha".to_vec());
    assert_eq!(storage.get_record(&b).unwrap().unwrap().content, b"bravo".to_vec());
}

#[tokio::test]
async fn test_stored_body_matches_fetched_body() {
    let mock_server = MockServer::start().await;
    let body: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    Mock::given(method("GET"))
        .and(path("/blob"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body.clone())
                .insert_header("content-type", "application/octet-stream"),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, 1, 0);
    let url = format!("{}/blob", mock_server.uri());
    write_urls(&config, &[url.clone()]);

    run_harvest(&config).await.unwrap();

    let record = open_db(&config).get_record(&url).unwrap().unwrap();
    assert_eq!(record.content, body);
    assert_eq!(record.status_code, Some(200));
    assert_eq!(
        record.content_type.as_deref(),
        Some("application/octet-stream")
    );
}

#[tokio::test]
async fn test_rerun_skips_stored_urls_without_fetching() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("first"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, 2, 1);
    let url = format!("{}/page", mock_server.uri());
    write_urls(&config, &[url.clone()]);

    let first = run_harvest(&config).await.unwrap();
    assert_eq!(first.saved, 1);

    let second = run_harvest(&config).await.unwrap();
    assert_eq!(second.saved, 0);
    assert_eq!(second.skipped, 1);

    let storage = open_db(&config);
    assert_eq!(storage.count_records().unwrap(), 1);
    assert_eq!(storage.get_record(&url).unwrap().unwrap().content, b"first".to_vec());
}

#[tokio::test]
async fn test_same_url_twice_stores_one_record() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/twice"))
        .respond_with(ResponseTemplate::new(200).set_body_string("once"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/twice", mock_server.uri());
    let storage = Arc::new(SqliteStorage::new_in_memory().unwrap());

    let summary = dispatcher(storage.clone(), 2, 2)
        .run(input(&[url.clone(), url.clone()]))
        .await
        .unwrap();

    assert_eq!(summary.enqueued, 2);
    assert_eq!(summary.saved, 1);
    assert_eq!(summary.skipped + summary.duplicates, 1);
    assert_eq!(summary.save_failed, 0);
    assert_eq!(storage.count_records().unwrap(), 1);
}

#[tokio::test]
async fn test_exhausted_retries_leave_no_record() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doomed"))
        .respond_with(ResponseTemplate::new(200).set_body_string("never stored"))
        .mount(&mock_server)
        .await;

    let max_retries = 3;
    let storage = Arc::new(FlakyStorage::new(u32::MAX));
    let url = format!("{}/doomed", mock_server.uri());

    let summary = dispatcher(storage.clone(), 1, max_retries)
        .run(input(&[url.clone()]))
        .await
        .unwrap();

    assert_eq!(summary.save_failed, 1);
    assert_eq!(summary.saved, 0);
    assert_eq!(storage.save_calls(), max_retries + 1);
    assert!(!storage.exists(&url).unwrap());
}

#[tokio::test]
async fn test_transient_failures_then_success_stores_once() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/eventually"))
        .respond_with(ResponseTemplate::new(200).set_body_string("made it"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let storage = Arc::new(FlakyStorage::new(2));
    let url = format!("{}/eventually", mock_server.uri());

    let summary = dispatcher(storage.clone(), 1, 5)
        .run(input(&[url.clone()]))
        .await
        .unwrap();

    assert_eq!(summary.saved, 1);
    assert_eq!(storage.save_calls(), 3);
    assert_eq!(storage.count_records().unwrap(), 1);
    assert_eq!(
        storage.get_record(&url).unwrap().unwrap().content,
        b"made it".to_vec()
    );
}

#[tokio::test]
async fn test_in_flight_never_exceeds_concurrency() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("slow")
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&mock_server)
        .await;

    let concurrency = 3;
    let urls: Vec<String> = (0..12)
        .map(|i| format!("{}/slow/{}", mock_server.uri(), i))
        .collect();
    let storage = Arc::new(SqliteStorage::new_in_memory().unwrap());

    let mut settings = PipelineSettings::with_concurrency(concurrency);
    // More workers than slots so the gate is what limits the pool
    settings.workers = 8;
    let dispatcher = Dispatcher::new(HarvestContext::new(
        storage.clone(),
        Fetcher::new(&FetcherConfig::default()).unwrap(),
        RetryPolicy::fixed(1, Duration::from_millis(1)),
        settings,
    ));

    let summary = dispatcher.run(input(&urls)).await.unwrap();

    assert_eq!(summary.saved, 12);
    assert!(summary.peak_in_flight >= 1);
    assert!(
        summary.peak_in_flight <= concurrency,
        "peak {} exceeded concurrency {}",
        summary.peak_in_flight,
        concurrency
    );
    assert_eq!(storage.count_records().unwrap(), 12);
}

#[tokio::test]
async fn test_unreachable_host_terminates_without_record() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, 2, 2);
    let url = format!("http://127.0.0.1:{}/nothing", port);
    write_urls(&config, &[url.clone()]);

    let summary = tokio::time::timeout(Duration::from_secs(30), run_harvest(&config))
        .await
        .expect("Harvest should terminate")
        .unwrap();

    assert_eq!(summary.fetch_failed, 1);
    assert_eq!(summary.saved, 0);
    assert!(!open_db(&config).exists(&url).unwrap());
}

#[tokio::test]
async fn test_mixed_input_counts_invalid_lines() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, 2, 0);
    let url = format!("{}/missing", mock_server.uri());
    write_urls(
        &config,
        &[
            "# seed list".to_string(),
            url.clone(),
            String::new(),
            "not a url".to_string(),
        ],
    );

    let summary = run_harvest(&config).await.unwrap();

    assert_eq!(summary.enqueued, 1);
    assert_eq!(summary.invalid, 1);
    // Error pages are still content
    assert_eq!(summary.saved, 1);
    let record = open_db(&config).get_record(&url).unwrap().unwrap();
    assert_eq!(record.status_code, Some(404));
    assert_eq!(record.content_lossy(), "not here");
}

#[tokio::test]
async fn test_non_utf8_line_does_not_stop_the_run() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut raw = Vec::new();
    raw.extend_from_slice(format!("{}/a\n", mock_server.uri()).as_bytes());
    raw.extend_from_slice(b"http://bad.test/\xff\xfe\n");
    raw.extend_from_slice(format!("{}/b\n", mock_server.uri()).as_bytes());
    raw.extend_from_slice(format!("{}/c\n", mock_server.uri()).as_bytes());

    let storage = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let summary = dispatcher(storage.clone(), 2, 0)
        .run(Cursor::new(raw))
        .await
        .expect("A bad line should not fail the run");

    assert_eq!(summary.enqueued, 3);
    assert_eq!(summary.invalid, 1);
    assert_eq!(summary.saved, 3);
    assert_eq!(storage.count_records().unwrap(), 3);
    assert!(storage
        .exists(&format!("{}/c", mock_server.uri()))
        .unwrap());
}

#[tokio::test]
async fn test_missing_input_file_fails_before_fetching() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, 1, 0);

    let result = run_harvest(&config).await;

    assert!(result.is_err());
}

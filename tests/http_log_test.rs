// End-to-end tests against a CT log served by wiremock
use async_trait::async_trait;
use base64::Engine;
use ct_tail::ct_log::leaf::{encode_precert_leaf, encode_x509_leaf};
use ct_tail::ct_log::monitor::EntryStats;
use ct_tail::ct_log::{
    CertificateRecord, HttpClientFactory, LogMonitor, LogMonitorConfig, LogSource, MonitorExit,
    MonitorSupervisor, PollOutcome,
};
use ct_tail::output::{OutputHandler, OutputManager};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE_TIMESTAMP: u64 = 1_714_566_600_000;

fn sth(size: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "tree_size": size,
        "timestamp": BASE_TIMESTAMP,
        "sha256_root_hash": "aGFzaA==",
        "tree_head_signature": "c2ln"
    }))
}

fn x509_entry(index: u64) -> serde_json::Value {
    let certified =
        rcgen::generate_simple_self_signed(vec![format!("host{}.example.com", index)]).unwrap();
    let leaf = encode_x509_leaf(BASE_TIMESTAMP + index, certified.cert.der());
    serde_json::json!({
        "leaf_input": base64::engine::general_purpose::STANDARD.encode(leaf),
        "extra_data": ""
    })
}

fn precert_entry() -> serde_json::Value {
    let leaf = encode_precert_leaf(BASE_TIMESTAMP, &[7u8; 32], b"tbs");
    serde_json::json!({
        "leaf_input": base64::engine::general_purpose::STANDARD.encode(leaf),
        "extra_data": ""
    })
}

/// Serves `initial` from get-sth once, then `current` forever
async fn mount_sizes(server: &MockServer, initial: u64, current: u64) {
    Mock::given(method("GET"))
        .and(path("/log/ct/v1/get-sth"))
        .respond_with(sth(initial))
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/log/ct/v1/get-sth"))
        .respond_with(sth(current))
        .mount(server)
        .await;
}

async fn mount_entries(
    server: &MockServer,
    start: u64,
    end_inclusive: u64,
    entries: Vec<serde_json::Value>,
) {
    Mock::given(method("GET"))
        .and(path("/log/ct/v1/get-entries"))
        .and(query_param("start", start.to_string()))
        .and(query_param("end", end_inclusive.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "entries": entries
        })))
        .mount(server)
        .await;
}

fn source(server: &MockServer) -> LogSource {
    LogSource::new(format!("{}/log/", server.uri()), "Test Log")
}

fn config(batch_size: u64) -> LogMonitorConfig {
    LogMonitorConfig {
        poll_interval: Duration::from_millis(100),
        batch_size,
        max_backoff_ticks: 0,
    }
}

#[tokio::test]
async fn test_new_entries_become_records() {
    let server = MockServer::start().await;
    mount_sizes(&server, 100, 105).await;
    mount_entries(&server, 100, 104, (100..105).map(x509_entry).collect()).await;

    let factory = HttpClientFactory::new(Duration::from_secs(5));
    let mut monitor = LogMonitor::initialize(source(&server), &factory, config(256))
        .await
        .unwrap();
    assert_eq!(monitor.cursor(), 100);

    let (tx, mut rx) = mpsc::channel(16);
    let outcome = monitor.poll_once(&tx).await.unwrap();
    assert_eq!(
        outcome,
        PollOutcome::Advanced(EntryStats {
            processed: 5,
            emitted: 5,
            skipped: 0
        })
    );
    assert_eq!(monitor.cursor(), 105);

    drop(tx);
    let mut records = Vec::new();
    while let Some(record) = rx.recv().await {
        records.push(record);
    }

    let indices: Vec<u64> = records.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![100, 101, 102, 103, 104]);
    assert_eq!(records[0].summary.names, "host100.example.com");
    assert_eq!(records[0].log_description, "Test Log");
    assert_eq!(
        records[0].summary.timestamp.timestamp_millis() as u64,
        BASE_TIMESTAMP + 100
    );

    // Same size again: nothing new
    let (tx, _rx) = mpsc::channel(16);
    assert_eq!(monitor.poll_once(&tx).await.unwrap(), PollOutcome::UpToDate);
    assert_eq!(monitor.cursor(), 105);
}

#[tokio::test]
async fn test_precertificates_are_skipped_but_consumed() {
    let server = MockServer::start().await;
    mount_sizes(&server, 10, 13).await;
    mount_entries(
        &server,
        10,
        12,
        vec![x509_entry(10), precert_entry(), x509_entry(12)],
    )
    .await;

    let factory = HttpClientFactory::new(Duration::from_secs(5));
    let mut monitor = LogMonitor::initialize(source(&server), &factory, config(256))
        .await
        .unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    let outcome = monitor.poll_once(&tx).await.unwrap();
    assert_eq!(
        outcome,
        PollOutcome::Advanced(EntryStats {
            processed: 3,
            emitted: 2,
            skipped: 1
        })
    );
    assert_eq!(monitor.cursor(), 13);

    drop(tx);
    assert_eq!(rx.recv().await.unwrap().index, 10);
    assert_eq!(rx.recv().await.unwrap().index, 12);
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_ranges_are_fetched_in_batches() {
    let server = MockServer::start().await;
    mount_sizes(&server, 0, 5).await;
    mount_entries(&server, 0, 1, (0..2).map(x509_entry).collect()).await;
    mount_entries(&server, 2, 3, (2..4).map(x509_entry).collect()).await;
    mount_entries(&server, 4, 4, vec![x509_entry(4)]).await;

    let factory = HttpClientFactory::new(Duration::from_secs(5));
    let mut monitor = LogMonitor::initialize(source(&server), &factory, config(2))
        .await
        .unwrap();

    let (tx, _rx) = mpsc::channel(16);
    monitor.poll_once(&tx).await.unwrap();
    assert_eq!(monitor.cursor(), 5);
}

#[tokio::test]
async fn test_failed_fetch_keeps_cursor() {
    let server = MockServer::start().await;
    mount_sizes(&server, 50, 52).await;
    Mock::given(method("GET"))
        .and(path("/log/ct/v1/get-entries"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let factory = HttpClientFactory::new(Duration::from_secs(5));
    let mut monitor = LogMonitor::initialize(source(&server), &factory, config(256))
        .await
        .unwrap();

    let (tx, _rx) = mpsc::channel(16);
    let err = monitor.poll_once(&tx).await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(monitor.cursor(), 50);
}

#[tokio::test]
async fn test_unreachable_initial_head_fails_initialization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/log/ct/v1/get-sth"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let factory = HttpClientFactory::new(Duration::from_secs(5));
    let result = LogMonitor::initialize(source(&server), &factory, config(256)).await;
    assert!(result.is_err());
}

#[derive(Default)]
struct CollectingOutput {
    records: Mutex<Vec<CertificateRecord>>,
}

#[async_trait]
impl OutputHandler for CollectingOutput {
    async fn emit_record(&self, record: &CertificateRecord) -> anyhow::Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_supervisor_streams_records_until_shutdown() {
    let server = MockServer::start().await;
    mount_sizes(&server, 100, 103).await;
    mount_entries(&server, 100, 102, (100..103).map(x509_entry).collect()).await;

    let supervisor = MonitorSupervisor::start(
        vec![
            source(&server),
            LogSource::new("not a url", "Broken Log"),
        ],
        Arc::new(HttpClientFactory::new(Duration::from_secs(5))),
        config(256),
        16,
    )
    .unwrap();

    let collector = Arc::new(CollectingOutput::default());
    let mut output = OutputManager::new();
    output.add_handler(collector.clone());

    let trigger = supervisor.shutdown_trigger();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(600)).await;
        trigger.trigger();
    });

    let report = supervisor.run(output).await;

    assert_eq!(report.records_emitted, 3);
    assert_eq!(report.started(), 1);
    assert_eq!(report.panicked, 0);
    assert_eq!(report.monitors[0].exit, MonitorExit::Stopped);
    assert_eq!(report.monitors[0].cursor, Some(103));
    assert!(matches!(report.monitors[1].exit, MonitorExit::Failed(_)));

    let indices: Vec<u64> = collector
        .records
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.index)
        .collect();
    assert_eq!(indices, vec![100, 101, 102]);
}

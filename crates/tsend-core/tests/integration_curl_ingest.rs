//! Integration test: real HTTP through the curl transport to a local ingest server.

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::ingest_server::{self, Reply};
use common::scripted::Collector;
use common::{batch, fast_backoff, points_in};
use tsend_core::{Client, CurlTransport, Envelope, TelemetryKind, TransportOptions};

fn curl_client(url: &str, observer: Arc<Collector>) -> Client {
    let endpoints: HashMap<TelemetryKind, String> = TelemetryKind::ALL
        .iter()
        .map(|k| (*k, url.to_string()))
        .collect();
    let envelope = Envelope::new("insert-key", endpoints).secondary_user_agent(Some("itest/1.0"));
    let transport = CurlTransport::new(TransportOptions {
        connect_timeout: Duration::from_secs(2),
        timeout: Duration::from_secs(5),
    });
    Client::builder(envelope, Arc::new(transport))
        .backoff(Arc::new(fast_backoff()))
        .observer(observer)
        .shutdown_timeout(Duration::from_secs(10))
        .build()
        .expect("client")
}

#[tokio::test]
async fn gzipped_batch_is_delivered_with_headers() {
    let server = ingest_server::start(vec![Reply::status(202)]);
    let seen = Collector::new();
    let c = curl_client(&server.url, Arc::clone(&seen));

    let b = batch(TelemetryKind::Spans, 3);
    let id = b.id();
    c.send(b).unwrap();
    c.shutdown().await;

    let outcomes = seen.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_success(), "{:?}", outcomes[0]);

    let received = server.received();
    assert_eq!(received.len(), 1);
    let req = &received[0];
    assert_eq!(req.path, "/v1/ingest");
    assert_eq!(req.header("Api-Key"), Some("insert-key"));
    assert_eq!(req.header("Content-Encoding"), Some("gzip"));
    assert_eq!(req.header("Data-Format"), Some("newrelic"));
    assert_eq!(req.header("X-Request-Id"), Some(id.to_string().as_str()));
    let ua = req.header("User-Agent").unwrap();
    assert!(ua.starts_with("tsend/") && ua.ends_with(" itest/1.0"), "{ua}");

    let body = req.json();
    assert_eq!(body[0]["common"]["attributes"]["service"], "test");
    assert_eq!(points_in(&req.body, TelemetryKind::Spans).len(), 3);
}

#[tokio::test]
async fn server_split_and_retry_after_round_trip() {
    let server = ingest_server::start(vec![
        Reply::status(413),
        Reply::status(429).header("Retry-After", "0"),
        Reply::status(202),
    ]);
    let seen = Collector::new();
    let c = curl_client(&server.url, Arc::clone(&seen));

    c.send(batch(TelemetryKind::Metrics, 4)).unwrap();
    let summary = c.shutdown().await;
    assert!(!summary.timed_out);

    let outcomes = seen.outcomes();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.is_success()));
    // One fragment was throttled once before being accepted.
    let mut attempts: Vec<u32> = outcomes.iter().map(|o| o.attempts).collect();
    attempts.sort_unstable();
    assert_eq!(attempts, vec![1, 2]);
    assert_eq!(server.received().len(), 4);
}

#[tokio::test]
async fn unreachable_endpoint_exhausts_as_transport_errors() {
    let seen = Collector::new();
    let c = Client::builder(
        common::envelope("http://127.0.0.1:9/v1"),
        Arc::new(CurlTransport::new(TransportOptions {
            connect_timeout: Duration::from_secs(1),
            timeout: Duration::from_secs(1),
        })),
    )
    .backoff(Arc::new(fast_backoff()))
    .limits(tsend_core::retry::RetryLimits {
        max_attempts: 2,
        ..Default::default()
    })
    .observer(seen.clone())
    .build()
    .unwrap();

    c.send(batch(TelemetryKind::Events, 1)).unwrap();
    c.shutdown().await;

    let outcomes = seen.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(
        outcomes[0].drop_reason(),
        Some(tsend_core::DropReason::Exhausted)
    );
    assert_eq!(outcomes[0].attempts, 2);
    assert!(matches!(
        &outcomes[0].outcome,
        tsend_core::OutcomeKind::Dropped {
            last_seen: Some(tsend_core::LastSeen::Error(_)),
            ..
        }
    ));
}

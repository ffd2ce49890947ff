#![allow(dead_code)]

pub mod ingest_server;
pub mod scripted;

use std::collections::HashMap;
use std::time::Duration;

use serde_json::json;
use tsend_core::retry::ExponentialBackoff;
use tsend_core::{Attributes, Batch, DataPoint, Envelope, TelemetryKind};

/// Uncompressed envelope pointing every kind at `url`.
pub fn envelope(url: &str) -> Envelope {
    let endpoints: HashMap<TelemetryKind, String> = TelemetryKind::ALL
        .iter()
        .map(|k| (*k, url.to_string()))
        .collect();
    Envelope::new("test-key", endpoints).compress(false)
}

/// Millisecond-scale backoff so retry tests stay fast.
pub fn fast_backoff() -> ExponentialBackoff {
    ExponentialBackoff {
        base_delay: Duration::from_millis(2),
        multiplier: 2.0,
        max_delay: Duration::from_millis(10),
        jitter: true,
    }
}

pub fn batch(kind: TelemetryKind, n: usize) -> Batch {
    Batch::new(
        kind,
        (0..n)
            .map(|i| DataPoint::new(json!({ "name": "p", "seq": i })))
            .collect(),
        Attributes::new().put("service", "test"),
    )
}

/// Data points in an uncompressed request body.
pub fn points_in(body: &[u8], kind: TelemetryKind) -> Vec<serde_json::Value> {
    let v: serde_json::Value = serde_json::from_slice(body).expect("JSON body");
    v[0][kind.field_name()]
        .as_array()
        .cloned()
        .unwrap_or_default()
}

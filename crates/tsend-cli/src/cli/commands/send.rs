//! `tsend send` – deliver one file of data points and report every outcome.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tsend_core::config::TsendConfig;
use tsend_core::{
    Attributes, Batch, Client, CurlTransport, DataPoint, LoggingObserver, Observer,
    TelemetryKind, TerminalOutcome,
};

#[derive(Debug)]
pub struct SendArgs {
    pub file: PathBuf,
    pub kind: TelemetryKind,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub no_compress: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Wrapped {
        #[serde(default)]
        common: Attributes,
        items: Vec<DataPoint>,
    },
    Bare(Vec<DataPoint>),
}

/// Parses a payload document into a single batch of `kind`.
pub(crate) fn parse_payload(data: &str, kind: TelemetryKind) -> Result<Batch> {
    let payload: Payload = serde_json::from_str(data)
        .context("expected {\"common\": {...}, \"items\": [...]} or an array of items")?;
    let (common, items) = match payload {
        Payload::Wrapped { common, items } => (common, items),
        Payload::Bare(items) => (Attributes::new(), items),
    };
    Ok(Batch::new(kind, items, common))
}

fn read_batch(path: &Path, kind: TelemetryKind) -> Result<Batch> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_payload(&data, kind).with_context(|| format!("parsing {}", path.display()))
}

/// Logs like `LoggingObserver` and keeps outcomes for the summary.
struct Report {
    outcomes: Mutex<Vec<TerminalOutcome>>,
}

impl Observer for Report {
    fn on_outcome(&self, outcome: &TerminalOutcome) {
        LoggingObserver.on_outcome(outcome);
        if let Ok(mut v) = self.outcomes.lock() {
            v.push(outcome.clone());
        }
    }
}

pub async fn run_send(mut cfg: TsendConfig, args: SendArgs) -> Result<()> {
    if let Some(key) = args.api_key {
        cfg.api_key = Some(key);
    }
    if let Some(url) = args.endpoint {
        cfg.endpoints.set(args.kind, url);
    }
    if args.no_compress {
        cfg.compression = false;
    }

    let batch = read_batch(&args.file, args.kind)?;
    let points = batch.len();
    let report = Arc::new(Report {
        outcomes: Mutex::new(Vec::new()),
    });
    let transport = Arc::new(CurlTransport::new(cfg.transport_options()?));
    let client = Client::from_config(&cfg, transport, report.clone())?;

    tracing::info!(
        kind = %args.kind,
        points,
        endpoint = cfg.endpoint(args.kind),
        "sending {}",
        args.file.display()
    );
    client.send(batch)?;
    let summary = client.shutdown().await;

    let outcomes = report
        .outcomes
        .lock()
        .map(|v| v.clone())
        .unwrap_or_default();
    let mut dropped_points = 0;
    for o in &outcomes {
        let label = if o.is_success() { "OK" } else { "DROPPED" };
        if !o.is_success() {
            dropped_points += o.points;
        }
        println!(
            "{:<8} {} points={} attempts={} {}",
            label,
            o.batch_id,
            o.points,
            o.attempts,
            o.detail()
        );
    }
    if summary.timed_out {
        println!("shutdown timed out; {} batch(es) abandoned", summary.abandoned);
    }
    if dropped_points > 0 {
        bail!("{dropped_points} of {points} data points were dropped");
    }
    Ok(())
}

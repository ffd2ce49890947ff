//! Telemetry batches: an immutable run of same-kind data points plus shared attributes.
//!
//! A `Batch` is a cheap handle: points live in an `Arc<[DataPoint]>` and a batch
//! views the half-open range `[start, end)` of it. Splitting produces two new
//! handles over the same storage, so the original is never mutated and no point
//! is copied.

mod attributes;
mod split;

pub use attributes::{AttributeValue, Attributes};
pub use split::{split, MAX_SPLIT_DEPTH};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Kind of telemetry carried by a batch. Selects the envelope field and endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryKind {
    Metrics,
    Spans,
    Events,
    Logs,
}

impl TelemetryKind {
    pub const ALL: [TelemetryKind; 4] = [
        TelemetryKind::Metrics,
        TelemetryKind::Spans,
        TelemetryKind::Events,
        TelemetryKind::Logs,
    ];

    /// Name of the array field holding the data points in the envelope.
    pub fn field_name(self) -> &'static str {
        match self {
            TelemetryKind::Metrics => "metrics",
            TelemetryKind::Spans => "spans",
            TelemetryKind::Events => "events",
            TelemetryKind::Logs => "logs",
        }
    }
}

impl fmt::Display for TelemetryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

impl std::str::FromStr for TelemetryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "metric" | "metrics" => Ok(TelemetryKind::Metrics),
            "span" | "spans" => Ok(TelemetryKind::Spans),
            "event" | "events" => Ok(TelemetryKind::Events),
            "log" | "logs" => Ok(TelemetryKind::Logs),
            other => Err(format!("unknown telemetry kind: {other}")),
        }
    }
}

/// One data point, already shaped by the caller's data-model builder.
///
/// The pipeline treats it as opaque JSON; only an `attributes` object (if any)
/// is inspected for ingest-limit warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataPoint(serde_json::Value);

impl DataPoint {
    pub fn new(value: serde_json::Value) -> Self {
        DataPoint(value)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    /// The point's own `attributes` object, when present.
    pub fn attributes(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.0.get("attributes").and_then(|a| a.as_object())
    }
}

impl From<serde_json::Value> for DataPoint {
    fn from(v: serde_json::Value) -> Self {
        DataPoint(v)
    }
}

/// Immutable batch handle. Cloning is cheap and shares point storage.
#[derive(Debug, Clone)]
pub struct Batch {
    id: Uuid,
    parent_id: Option<Uuid>,
    depth: u32,
    kind: TelemetryKind,
    common: Arc<Attributes>,
    points: Arc<[DataPoint]>,
    start: usize,
    end: usize,
}

impl Batch {
    /// Create a batch with a fresh identifier.
    pub fn new(kind: TelemetryKind, points: Vec<DataPoint>, common: Attributes) -> Self {
        let end = points.len();
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            depth: 0,
            kind,
            common: Arc::new(common),
            points: points.into(),
            start: 0,
            end,
        }
    }

    /// New fragment over `[start, end)` of the parent's storage, with its own id.
    pub(crate) fn fragment(parent: &Batch, start: usize, end: usize) -> Self {
        debug_assert!(parent.start <= start && start <= end && end <= parent.end);
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(parent.id),
            depth: parent.depth + 1,
            kind: parent.kind,
            common: Arc::clone(&parent.common),
            points: Arc::clone(&parent.points),
            start,
            end,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Identifier of the batch this fragment was split from.
    pub fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }

    /// Number of splits between the submitted batch and this one (0 = original).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn kind(&self) -> TelemetryKind {
        self.kind
    }

    pub fn common(&self) -> &Attributes {
        &self.common
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Position of this batch's points inside the submitted batch, `[start, end)`.
    pub fn span(&self) -> (usize, usize) {
        (self.start, self.end)
    }
}

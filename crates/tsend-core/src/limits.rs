//! Ingest limit checks. Violations are logged, never enforced: the endpoint
//! is the authority and may truncate or drop offending attributes itself.

use crate::batch::{AttributeValue, Batch, TelemetryKind};

/// Maximum attributes per event or log record accepted by ingest.
pub const MAX_EVENT_ATTRIBUTES: usize = 254;
pub const MAX_LOG_ATTRIBUTES: usize = 254;
pub const MAX_METRIC_ATTRIBUTES: usize = 100;
pub const MAX_ATTRIBUTE_NAME_LEN: usize = 255;
pub const MAX_ATTRIBUTE_VALUE_LEN: usize = 4096;

/// A single limit violation found in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitWarning {
    TooManyAttributes { count: usize, max: usize },
    NameTooLong { name: String },
    ValueTooLong { name: String, len: usize },
}

fn max_attributes(kind: TelemetryKind) -> Option<usize> {
    match kind {
        TelemetryKind::Events => Some(MAX_EVENT_ATTRIBUTES),
        TelemetryKind::Logs => Some(MAX_LOG_ATTRIBUTES),
        TelemetryKind::Metrics => Some(MAX_METRIC_ATTRIBUTES),
        TelemetryKind::Spans => None,
    }
}

fn check_set<'a, I>(kind: TelemetryKind, count: usize, entries: I, out: &mut Vec<LimitWarning>)
where
    I: Iterator<Item = (&'a str, Option<usize>)>,
{
    if let Some(max) = max_attributes(kind) {
        if count > max {
            out.push(LimitWarning::TooManyAttributes { count, max });
        }
    }
    for (name, str_len) in entries {
        if name.len() > MAX_ATTRIBUTE_NAME_LEN {
            out.push(LimitWarning::NameTooLong {
                name: name.to_string(),
            });
        }
        if let Some(len) = str_len.filter(|l| *l > MAX_ATTRIBUTE_VALUE_LEN) {
            out.push(LimitWarning::ValueTooLong {
                name: name.to_string(),
                len,
            });
        }
    }
}

/// Checks the shared attributes and each point's `attributes` object.
pub fn check(batch: &Batch) -> Vec<LimitWarning> {
    let mut out = Vec::new();
    let common = batch.common();
    check_set(
        batch.kind(),
        common.len(),
        common.iter().map(|(k, v)| {
            let len = match v {
                AttributeValue::String(s) => Some(s.len()),
                _ => None,
            };
            (k.as_str(), len)
        }),
        &mut out,
    );
    for point in batch.points() {
        if let Some(attrs) = point.attributes() {
            check_set(
                batch.kind(),
                attrs.len(),
                attrs
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str().map(str::len))),
                &mut out,
            );
        }
    }
    out
}

/// Runs `check` and logs each violation at warn level.
pub fn warn_on_violations(batch: &Batch) {
    for w in check(batch) {
        match w {
            LimitWarning::TooManyAttributes { count, max } => tracing::warn!(
                batch_id = %batch.id(),
                kind = %batch.kind(),
                count,
                max,
                "attribute count exceeds ingest limit"
            ),
            LimitWarning::NameTooLong { name } => tracing::warn!(
                batch_id = %batch.id(),
                name = %name,
                "attribute name exceeds {} characters",
                MAX_ATTRIBUTE_NAME_LEN
            ),
            LimitWarning::ValueTooLong { name, len } => tracing::warn!(
                batch_id = %batch.id(),
                name = %name,
                len,
                "attribute value exceeds {} characters",
                MAX_ATTRIBUTE_VALUE_LEN
            ),
        }
    }
}

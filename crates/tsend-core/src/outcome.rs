//! Terminal outcomes and the observer that receives them.

use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::batch::{Batch, TelemetryKind};
use crate::retry::SendAttempt;

/// Why a batch or fragment was given up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// Retry budget (attempts or elapsed time) consumed.
    Exhausted,
    /// Endpoint permanently rejected the request.
    Rejected,
    /// A single data point is still too large.
    Unsplittable,
    /// Client shut down while the batch was backing off.
    Shutdown,
    /// The batch could not be encoded into a request.
    Encoding,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::Exhausted => "max-retries-exceeded",
            DropReason::Rejected => "rejected",
            DropReason::Unsplittable => "payload-too-large-unsplittable",
            DropReason::Shutdown => "shutdown",
            DropReason::Encoding => "encoding-failed",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last thing the endpoint (or the network) said before the drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastSeen {
    Status { code: u16, body: String },
    Error(String),
}

impl fmt::Display for LastSeen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastSeen::Status { code, body } if body.is_empty() => write!(f, "HTTP {code}"),
            LastSeen::Status { code, body } => write!(f, "HTTP {code}: {body}"),
            LastSeen::Error(e) => f.write_str(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeKind {
    Success {
        status: u16,
    },
    Dropped {
        reason: DropReason,
        last_seen: Option<LastSeen>,
    },
}

/// Final result for one batch or fragment. Produced once, never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalOutcome {
    pub batch_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub kind: TelemetryKind,
    /// Number of data points in this batch or fragment.
    pub points: usize,
    /// Attempts made (0 if dropped before the first one).
    pub attempts: u32,
    pub outcome: OutcomeKind,
}

impl TerminalOutcome {
    pub(crate) fn success(batch: &Batch, attempts: u32, status: u16) -> Self {
        Self::new(batch, attempts, OutcomeKind::Success { status })
    }

    pub(crate) fn dropped(
        batch: &Batch,
        attempts: u32,
        reason: DropReason,
        last_seen: Option<LastSeen>,
    ) -> Self {
        Self::new(batch, attempts, OutcomeKind::Dropped { reason, last_seen })
    }

    fn new(batch: &Batch, attempts: u32, outcome: OutcomeKind) -> Self {
        Self {
            batch_id: batch.id(),
            parent_id: batch.parent_id(),
            kind: batch.kind(),
            points: batch.len(),
            attempts,
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, OutcomeKind::Success { .. })
    }

    pub fn drop_reason(&self) -> Option<DropReason> {
        match self.outcome {
            OutcomeKind::Dropped { reason, .. } => Some(reason),
            OutcomeKind::Success { .. } => None,
        }
    }

    /// Human-readable detail: status for successes, reason and last response for drops.
    pub fn detail(&self) -> String {
        match &self.outcome {
            OutcomeKind::Success { status } => format!("accepted (HTTP {status})"),
            OutcomeKind::Dropped {
                reason,
                last_seen: Some(last),
            } => format!("{reason}: {last}"),
            OutcomeKind::Dropped { reason, .. } => reason.to_string(),
        }
    }
}

/// Receives terminal outcomes from the client.
///
/// Called from the batch's task; implementations must be cheap and must not block.
pub trait Observer: Send + Sync {
    /// Exactly once per terminal batch or fragment.
    fn on_outcome(&self, outcome: &TerminalOutcome);

    /// Before each backoff wait.
    fn on_retry(&self, _attempt: &SendAttempt<'_>, _delay: Duration) {}

    /// When a batch is replaced by two fragments.
    fn on_split(&self, _parent: &Batch, _left: &Batch, _right: &Batch) {}
}

impl<F> Observer for F
where
    F: Fn(&TerminalOutcome) + Send + Sync,
{
    fn on_outcome(&self, outcome: &TerminalOutcome) {
        self(outcome)
    }
}

/// Observer that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl Observer for LoggingObserver {
    fn on_outcome(&self, outcome: &TerminalOutcome) {
        match &outcome.outcome {
            OutcomeKind::Success { status } => tracing::debug!(
                batch_id = %outcome.batch_id,
                kind = %outcome.kind,
                points = outcome.points,
                attempts = outcome.attempts,
                status,
                "batch delivered"
            ),
            OutcomeKind::Dropped { .. } => tracing::warn!(
                batch_id = %outcome.batch_id,
                kind = %outcome.kind,
                points = outcome.points,
                attempts = outcome.attempts,
                "batch dropped: {}",
                outcome.detail()
            ),
        }
    }

    fn on_retry(&self, attempt: &SendAttempt<'_>, delay: Duration) {
        tracing::info!(
            batch_id = %attempt.batch.id(),
            attempt = attempt.number,
            delay_ms = delay.as_millis() as u64,
            "batch send failed, backing off"
        );
    }

    fn on_split(&self, parent: &Batch, left: &Batch, right: &Batch) {
        tracing::info!(
            batch_id = %parent.id(),
            left = %left.id(),
            right = %right.id(),
            points = parent.len(),
            "batch too large, split in two"
        );
    }
}

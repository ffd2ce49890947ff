//! Sender: drives one batch to a terminal outcome or to a split.
//!
//! ```text
//! ATTEMPTING ─┬─ Accepted ──────────────▶ ACCEPTED
//!             ├─ Retryable/Transport ───▶ BACKING_OFF ─▶ ATTEMPTING
//!             │    (budget spent) ──────▶ DROPPED (exhausted)
//!             ├─ SplitRequired ─────────▶ SPLITTING (two new loops)
//!             │    (one point) ─────────▶ DROPPED (unsplittable)
//!             └─ Fatal ─────────────────▶ DROPPED (rejected)
//! ```
//!
//! The loop never recurses into fragments. A split is handed back to the
//! caller as [`Step::Split`] so each fragment can be scheduled as its own task
//! with a fresh retry budget.

mod attempt;

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::batch::{split, Batch};
use crate::envelope::Envelope;
use crate::outcome::{DropReason, LastSeen, Observer, TerminalOutcome};
use crate::retry::{classify, Backoff, Disposition, RetryLimits, RetryState, SendAttempt};
use crate::transport::{Response, Transport, TransportError};

/// Where a sender loop ended up.
#[derive(Debug)]
pub enum Step {
    /// Terminal for this batch; report to the observer.
    Done(TerminalOutcome),
    /// Replaced by two fragments; no outcome for the parent.
    Split(Batch, Batch),
}

/// Shared, immutable pipeline configuration. One instance serves every loop.
pub struct Sender {
    envelope: Envelope,
    transport: Arc<dyn Transport>,
    backoff: Arc<dyn Backoff>,
    limits: RetryLimits,
}

fn last_seen(result: &Result<Response, TransportError>) -> LastSeen {
    match result {
        Ok(r) => LastSeen::Status {
            code: r.status,
            body: r.body.clone(),
        },
        Err(e) => LastSeen::Error(e.to_string()),
    }
}

impl Sender {
    pub fn new(
        envelope: Envelope,
        transport: Arc<dyn Transport>,
        backoff: Arc<dyn Backoff>,
        limits: RetryLimits,
    ) -> Self {
        Self {
            envelope,
            transport,
            backoff,
            limits,
        }
    }

    pub fn limits(&self) -> &RetryLimits {
        &self.limits
    }

    fn retry_delay(&self, attempt: u32, disposition: Disposition) -> Duration {
        match disposition {
            Disposition::Retryable {
                retry_after: Some(requested),
            } if self.limits.honor_retry_after => requested.min(self.limits.max_retry_after),
            _ => self.backoff.delay(attempt),
        }
    }

    /// Runs the attempt loop for `batch` until it terminates or must be split.
    ///
    /// `cancel` interrupts backoff waits and prevents a first attempt; an
    /// in-flight transport call is always allowed to finish.
    pub async fn drive(
        &self,
        batch: &Batch,
        observer: &dyn Observer,
        cancel: &CancellationToken,
    ) -> Step {
        if cancel.is_cancelled() {
            return Step::Done(TerminalOutcome::dropped(
                batch,
                0,
                DropReason::Shutdown,
                None,
            ));
        }
        let mut state = RetryState::new();
        loop {
            let attempt = state.attempt();
            let result = match attempt::perform(&self.envelope, &self.transport, batch).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(batch_id = %batch.id(), "cannot encode batch: {}", e);
                    return Step::Done(TerminalOutcome::dropped(
                        batch,
                        attempt - 1,
                        DropReason::Encoding,
                        Some(LastSeen::Error(e.to_string())),
                    ));
                }
            };
            let disposition = classify(&result);
            tracing::debug!(
                batch_id = %batch.id(),
                kind = %batch.kind(),
                attempt,
                ?disposition,
                "attempt finished"
            );

            match disposition {
                Disposition::Accepted => {
                    let status = result.as_ref().map(|r| r.status).unwrap_or_default();
                    return Step::Done(TerminalOutcome::success(batch, attempt, status));
                }
                Disposition::Fatal => {
                    let seen = last_seen(&result);
                    tracing::warn!(batch_id = %batch.id(), attempt, "batch rejected: {}", seen);
                    return Step::Done(TerminalOutcome::dropped(
                        batch,
                        attempt,
                        DropReason::Rejected,
                        Some(seen),
                    ));
                }
                Disposition::SplitRequired => {
                    return match split(batch) {
                        Some((left, right)) => {
                            tracing::info!(
                                batch_id = %batch.id(),
                                points = batch.len(),
                                depth = left.depth(),
                                "payload too large, splitting into {} + {}",
                                left.len(),
                                right.len()
                            );
                            observer.on_split(batch, &left, &right);
                            Step::Split(left, right)
                        }
                        None => {
                            tracing::warn!(
                                batch_id = %batch.id(),
                                points = batch.len(),
                                "payload too large and cannot be split further"
                            );
                            Step::Done(TerminalOutcome::dropped(
                                batch,
                                attempt,
                                DropReason::Unsplittable,
                                Some(last_seen(&result)),
                            ))
                        }
                    };
                }
                Disposition::Retryable { .. } | Disposition::TransportError => {
                    if state.exhausted(&self.limits) {
                        tracing::warn!(
                            batch_id = %batch.id(),
                            attempts = attempt,
                            "retry budget exhausted"
                        );
                        return Step::Done(TerminalOutcome::dropped(
                            batch,
                            attempt,
                            DropReason::Exhausted,
                            Some(last_seen(&result)),
                        ));
                    }
                    if cancel.is_cancelled() {
                        return Step::Done(TerminalOutcome::dropped(
                            batch,
                            attempt,
                            DropReason::Shutdown,
                            Some(last_seen(&result)),
                        ));
                    }

                    let delay = self.retry_delay(attempt, disposition);
                    tracing::info!(
                        batch_id = %batch.id(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "backing off before retry"
                    );
                    observer.on_retry(
                        &SendAttempt {
                            batch,
                            number: attempt,
                            elapsed: state.elapsed(),
                        },
                        delay,
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => {
                            tracing::debug!(batch_id = %batch.id(), "backoff interrupted by shutdown");
                            return Step::Done(TerminalOutcome::dropped(
                                batch,
                                attempt,
                                DropReason::Shutdown,
                                Some(last_seen(&result)),
                            ));
                        }
                    }
                    state.advance(delay);
                }
            }
        }
    }
}

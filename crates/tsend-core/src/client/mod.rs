//! Public façade: accepts batches, runs one task per batch (and per fragment),
//! and reports terminal outcomes to the observer.
//!
//! `send` never blocks and never waits for delivery. Batches are independent:
//! no ordering holds between them or between fragments of one batch.

mod admission;

pub use admission::{Admission, AdmissionPolicy, FamilyPermit};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::batch::Batch;
use crate::config::TsendConfig;
use crate::envelope::Envelope;
use crate::error::{ConfigError, SendError};
use crate::limits;
use crate::outcome::{DropReason, LoggingObserver, Observer, TerminalOutcome};
use crate::retry::{Backoff, ExponentialBackoff, RetryLimits};
use crate::sender::{Sender, Step};
use crate::transport::Transport;

pub const DEFAULT_MAX_CONCURRENT_BATCHES: usize = 64;
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of [`Client::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownSummary {
    /// In-flight work did not finish within the shutdown timeout.
    pub timed_out: bool,
    /// Batches or fragments reported as dropped with reason `shutdown`.
    pub abandoned: usize,
}

struct Inner {
    sender: Sender,
    observer: Arc<dyn Observer>,
    admission: Admission,
    tracker: TaskTracker,
    cancel: CancellationToken,
    /// Set by `shutdown`; `send` spawns only while holding a read guard.
    closed: RwLock<bool>,
    abandoned: AtomicUsize,
    shutdown_timeout: Duration,
    runtime: Handle,
}

impl Inner {
    fn report(&self, outcome: &TerminalOutcome) {
        if outcome.drop_reason() == Some(DropReason::Shutdown) {
            self.abandoned.fetch_add(1, Ordering::Relaxed);
        }
        self.observer.on_outcome(outcome);
    }
}

/// Spawns the sender loop for `batch`; a split re-enters here once per fragment.
///
/// Once shutdown has cancelled, nothing new starts: the batch is reported as
/// abandoned without an attempt.
fn dispatch(inner: &Arc<Inner>, batch: Batch, permit: FamilyPermit) {
    if inner.cancel.is_cancelled() {
        tracing::debug!(batch_id = %batch.id(), points = batch.len(), "not starting batch after shutdown");
        inner.report(&TerminalOutcome::dropped(
            &batch,
            0,
            DropReason::Shutdown,
            None,
        ));
        return;
    }
    let task_inner = Arc::clone(inner);
    inner.tracker.spawn_on(
        async move {
            let inner = task_inner;
            match inner
                .sender
                .drive(&batch, inner.observer.as_ref(), &inner.cancel)
                .await
            {
                Step::Done(outcome) => inner.report(&outcome),
                Step::Split(left, right) => {
                    dispatch(&inner, left, Arc::clone(&permit));
                    dispatch(&inner, right, permit);
                }
            }
        },
        &inner.runtime,
    );
}

/// Cheap to clone; all clones drive the same pipeline.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    pub fn builder(envelope: Envelope, transport: Arc<dyn Transport>) -> ClientBuilder {
        ClientBuilder {
            envelope,
            transport,
            backoff: Arc::new(ExponentialBackoff::default()),
            limits: RetryLimits::default(),
            observer: Arc::new(LoggingObserver),
            max_concurrent_batches: DEFAULT_MAX_CONCURRENT_BATCHES,
            admission: AdmissionPolicy::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            runtime: None,
        }
    }

    /// Builds a client from loaded configuration.
    pub fn from_config(
        cfg: &TsendConfig,
        transport: Arc<dyn Transport>,
        observer: Arc<dyn Observer>,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let retry = cfg.retry_config();
        Client::builder(cfg.envelope()?, transport)
            .backoff(Arc::new(retry.backoff()?))
            .limits(retry.limits()?)
            .observer(observer)
            .admission(cfg.max_concurrent_batches, cfg.admission)
            .shutdown_timeout(cfg.shutdown_timeout()?)
            .build()
    }

    /// Hands `batch` to its own task and returns immediately.
    ///
    /// Fails only for an empty batch, after `shutdown` has begun, or when the
    /// admission limit is reached under [`AdmissionPolicy::Reject`].
    pub fn send(&self, batch: Batch) -> Result<(), SendError> {
        let inner = &self.inner;
        // Held until the task is spawned, so `shutdown` cannot finish waiting in between.
        let closed = inner.closed.read().unwrap_or_else(PoisonError::into_inner);
        if *closed {
            return Err(SendError::ShuttingDown);
        }
        if batch.is_empty() {
            return Err(SendError::EmptyBatch);
        }
        limits::warn_on_violations(&batch);

        if let Some(permit) = inner.admission.try_admit() {
            tracing::debug!(batch_id = %batch.id(), kind = %batch.kind(), points = batch.len(), "batch accepted");
            dispatch(inner, batch, permit);
            return Ok(());
        }

        match inner.admission.policy() {
            AdmissionPolicy::Reject => {
                tracing::warn!(
                    batch_id = %batch.id(),
                    limit = inner.admission.limit(),
                    "admission limit reached, refusing batch"
                );
                Err(SendError::Saturated {
                    limit: inner.admission.limit(),
                })
            }
            AdmissionPolicy::Queue => {
                tracing::debug!(batch_id = %batch.id(), "admission limit reached, queueing batch");
                let task_inner = Arc::clone(inner);
                inner.tracker.spawn_on(
                    async move {
                        let inner = task_inner;
                        let permit = tokio::select! {
                            p = inner.admission.admit() => p,
                            _ = inner.cancel.cancelled() => None,
                        };
                        match permit {
                            Some(p) => dispatch(&inner, batch, p),
                            None => inner.report(&TerminalOutcome::dropped(
                                &batch,
                                0,
                                DropReason::Shutdown,
                                None,
                            )),
                        }
                    },
                    &inner.runtime,
                );
                Ok(())
            }
        }
    }

    /// Tasks (batches, fragments and queued submissions) not yet terminal.
    pub fn in_flight(&self) -> usize {
        self.inner.tracker.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        *self
            .inner
            .closed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Stops accepting batches and waits for in-flight work.
    ///
    /// After the shutdown timeout, backoff waits are cancelled and those
    /// batches are reported as dropped with reason `shutdown`. Transport calls
    /// already in flight are left to finish on their own terms.
    pub async fn shutdown(&self) -> ShutdownSummary {
        let inner = &self.inner;
        {
            let mut closed = inner.closed.write().unwrap_or_else(PoisonError::into_inner);
            *closed = true;
            inner.tracker.close();
        }

        let timed_out = tokio::time::timeout(inner.shutdown_timeout, inner.tracker.wait())
            .await
            .is_err();
        if timed_out {
            tracing::warn!(
                in_flight = inner.tracker.len(),
                timeout_ms = inner.shutdown_timeout.as_millis() as u64,
                "shutdown timeout reached, abandoning batches in backoff"
            );
            inner.cancel.cancel();
            inner.tracker.wait().await;
        }
        let summary = ShutdownSummary {
            timed_out,
            abandoned: inner.abandoned.load(Ordering::Relaxed),
        };
        tracing::info!(?summary, "client shut down");
        summary
    }
}

pub struct ClientBuilder {
    envelope: Envelope,
    transport: Arc<dyn Transport>,
    backoff: Arc<dyn Backoff>,
    limits: RetryLimits,
    observer: Arc<dyn Observer>,
    max_concurrent_batches: usize,
    admission: AdmissionPolicy,
    shutdown_timeout: Duration,
    runtime: Option<Handle>,
}

impl ClientBuilder {
    pub fn backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn limits(mut self, limits: RetryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Bound on concurrently in-flight batch families and the policy past it.
    pub fn admission(mut self, max_concurrent_batches: usize, policy: AdmissionPolicy) -> Self {
        self.max_concurrent_batches = max_concurrent_batches;
        self.admission = policy;
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Runtime for batch tasks; defaults to the one `build` is called from.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<Client, ConfigError> {
        if self.max_concurrent_batches == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.limits.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        let runtime = match self.runtime {
            Some(h) => h,
            None => Handle::try_current().map_err(|_| ConfigError::NoRuntime)?,
        };
        let sender = Sender::new(self.envelope, self.transport, self.backoff, self.limits);
        Ok(Client {
            inner: Arc::new(Inner {
                sender,
                observer: self.observer,
                admission: Admission::new(self.max_concurrent_batches, self.admission),
                tracker: TaskTracker::new(),
                cancel: CancellationToken::new(),
                closed: RwLock::new(false),
                abandoned: AtomicUsize::new(0),
                shutdown_timeout: self.shutdown_timeout,
                runtime,
            }),
        })
    }
}

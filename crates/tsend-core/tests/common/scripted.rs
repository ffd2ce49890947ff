//! In-memory transport and observer used to drive the client without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tsend_core::retry::SendAttempt;
use tsend_core::transport::{Request, Response, Transport, TransportError};
use tsend_core::{Batch, Observer, TerminalOutcome};

type Reply = Result<Response, String>;

/// Answers each request from a queue, repeating the last reply when it runs out.
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    requests: Mutex<Vec<Request>>,
    latency: Duration,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Self::with_latency(replies, Duration::ZERO)
    }

    pub fn statuses(codes: &[u16]) -> Arc<Self> {
        Self::new(codes.iter().map(|c| Ok(Response::new(*c))).collect())
    }

    /// Each call sleeps for `latency` before replying.
    pub fn with_latency(replies: Vec<Reply>, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            latency,
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        let next = self.replies.lock().unwrap().pop_front();
        let reply = match next {
            Some(r) => {
                *self.last.lock().unwrap() = Some(r.clone());
                r
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Ok(Response::new(202))),
        };
        reply.map_err(TransportError::Other)
    }
}

/// Transport whose reply is computed from the request.
pub struct FnTransport<F>(pub F);

impl<F> Transport for FnTransport<F>
where
    F: Fn(&Request) -> Response + Send + Sync + 'static,
{
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        Ok((self.0)(request))
    }
}

/// Observer that keeps everything it is told.
#[derive(Default)]
pub struct Collector {
    pub outcomes: Mutex<Vec<TerminalOutcome>>,
    pub retries: Mutex<Vec<(u32, Duration)>>,
    pub splits: Mutex<Vec<(usize, usize, usize)>>,
}

impl Collector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn outcomes(&self) -> Vec<TerminalOutcome> {
        self.outcomes.lock().unwrap().clone()
    }

    pub fn retries(&self) -> Vec<(u32, Duration)> {
        self.retries.lock().unwrap().clone()
    }
}

impl Observer for Collector {
    fn on_outcome(&self, outcome: &TerminalOutcome) {
        self.outcomes.lock().unwrap().push(outcome.clone());
    }

    fn on_retry(&self, attempt: &SendAttempt<'_>, delay: Duration) {
        self.retries.lock().unwrap().push((attempt.number, delay));
    }

    fn on_split(&self, parent: &Batch, left: &Batch, right: &Batch) {
        self.splits
            .lock()
            .unwrap()
            .push((parent.len(), left.len(), right.len()));
    }
}

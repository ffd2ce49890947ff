//! Reliable delivery of telemetry batches (metrics, spans, events, logs) to an
//! HTTP ingest endpoint.
//!
//! A [`Client`] runs every submitted [`Batch`] through its own sender loop:
//! the response is classified, retryable failures back off exponentially,
//! oversize payloads are split in half and re-sent, and each batch (or
//! fragment) ends in exactly one [`TerminalOutcome`] reported to the
//! configured [`Observer`].

pub mod batch;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod limits;
pub mod logging;
pub mod outcome;
pub mod retry;
pub mod sender;
pub mod transport;

pub use batch::{AttributeValue, Attributes, Batch, DataPoint, TelemetryKind};
pub use client::{AdmissionPolicy, Client, ClientBuilder, ShutdownSummary};
pub use envelope::{Envelope, KeyKind};
pub use error::{ConfigError, SendError};
pub use outcome::{DropReason, LastSeen, LoggingObserver, Observer, OutcomeKind, TerminalOutcome};
pub use transport::{CurlTransport, Transport, TransportOptions};

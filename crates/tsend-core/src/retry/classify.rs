//! Classify a transport outcome into the sender's next action.
//!
//! Status table:
//!
//! | status                         | disposition        |
//! |--------------------------------|--------------------|
//! | 2xx                            | `Accepted`         |
//! | 413                            | `SplitRequired`    |
//! | 408, 429                       | `Retryable`        |
//! | 5xx                            | `Retryable`        |
//! | other 4xx (400, 401, 403, ...) | `Fatal`            |
//! | 1xx, 3xx, anything else        | `Fatal`            |
//! | no response                    | `TransportError`   |
//!
//! A 429 without a usable `Retry-After` carries no requested wait, so the
//! sender falls back to its computed backoff rather than a fixed pause.

use std::time::Duration;

use crate::transport::{Response, TransportError};

/// What a single attempt's result means for the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Endpoint took the batch.
    Accepted,
    /// Transient overload or rate limiting. `retry_after` is the server's
    /// requested wait, when it sent a usable `Retry-After` header.
    Retryable { retry_after: Option<Duration> },
    /// Payload exceeds the endpoint's size limit.
    SplitRequired,
    /// Permanently rejected; retrying cannot help.
    Fatal,
    /// No response received.
    TransportError,
}

impl Disposition {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Disposition::Retryable { .. } | Disposition::TransportError
        )
    }
}

/// Classify an HTTP status code (without looking at headers).
pub fn classify_status(status: u16) -> Disposition {
    match status {
        200..=299 => Disposition::Accepted,
        413 => Disposition::SplitRequired,
        408 | 429 | 500..=599 => Disposition::Retryable { retry_after: None },
        _ => Disposition::Fatal,
    }
}

/// Parse `Retry-After` as delay-seconds. HTTP-date forms are not honoured.
pub fn retry_after(response: &Response) -> Option<Duration> {
    response
        .header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Classify a response, picking up `Retry-After` on 429.
pub fn classify_response(response: &Response) -> Disposition {
    match classify_status(response.status) {
        Disposition::Retryable { .. } if response.status == 429 => Disposition::Retryable {
            retry_after: retry_after(response),
        },
        d => d,
    }
}

/// Classify the full outcome of one transport call.
pub fn classify(result: &Result<Response, TransportError>) -> Disposition {
    match result {
        Ok(response) => classify_response(response),
        Err(_) => Disposition::TransportError,
    }
}

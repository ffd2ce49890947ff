//! Transport seam: one blocking request/response exchange.
//!
//! The sender depends only on the [`Transport`] trait. [`CurlTransport`] is the
//! default adapter; tests and callers can plug in anything else.

mod curl;

pub use self::curl::{CurlTransport, TransportOptions};

use std::time::Duration;

/// A fully prepared POST: endpoint, headers and (possibly compressed) body.
#[derive(Debug, Clone)]
pub struct Request {
    pub endpoint: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Whatever the endpoint answered, including non-2xx statuses.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup (first match).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// No response was received: connection refused, DNS failure, timeout, etc.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("curl: {0}")]
    Curl(#[from] ::curl::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Other(String),
}

/// Performs a single exchange. Must be safe to call from many threads at once.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        (**self).send(request)
    }
}

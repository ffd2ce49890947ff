//! Envelope contract: batch → JSON body → (gzip) → headers → [`Request`].
//!
//! Body shape: `[{"common": {"attributes": {...}}, "<kind>": [point, ...]}]`.
//! The `common` block is omitted when the batch has no shared attributes.

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

use crate::batch::{Attributes, Batch, DataPoint, TelemetryKind};
use crate::transport::Request;

pub const USER_AGENT_PREFIX: &str = concat!("tsend/", env!("CARGO_PKG_VERSION"));

/// Which credential header the API key is sent in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// `Api-Key` header (insert key).
    #[default]
    Insert,
    /// `X-License-Key` header.
    License,
}

impl KeyKind {
    pub fn header_name(self) -> &'static str {
        match self {
            KeyKind::Insert => "Api-Key",
            KeyKind::License => "X-License-Key",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("failed to encode batch as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to compress payload: {0}")]
    Compression(#[from] std::io::Error),
    #[error("no endpoint configured for {0}")]
    NoEndpoint(TelemetryKind),
}

#[derive(Serialize)]
struct Common<'a> {
    attributes: &'a Attributes,
}

#[derive(Serialize)]
struct Block<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    common: Option<Common<'a>>,
    #[serde(flatten)]
    data: HashMap<&'static str, &'a [DataPoint]>,
}

/// Encodes the uncompressed JSON body for a batch.
pub fn to_json(batch: &Batch) -> Result<Vec<u8>, EnvelopeError> {
    let common = if batch.common().is_empty() {
        None
    } else {
        Some(Common {
            attributes: batch.common(),
        })
    };
    let mut data = HashMap::with_capacity(1);
    data.insert(batch.kind().field_name(), batch.points());
    Ok(serde_json::to_vec(&[Block { common, data }])?)
}

pub fn gzip(bytes: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 4), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// Everything needed to turn a batch into a request.
#[derive(Debug, Clone)]
pub struct Envelope {
    api_key: String,
    key_kind: KeyKind,
    endpoints: HashMap<TelemetryKind, String>,
    compress: bool,
    audit_logging: bool,
    user_agent: String,
}

impl Envelope {
    pub fn new(api_key: impl Into<String>, endpoints: HashMap<TelemetryKind, String>) -> Self {
        Self {
            api_key: api_key.into(),
            key_kind: KeyKind::Insert,
            endpoints,
            compress: true,
            audit_logging: false,
            user_agent: USER_AGENT_PREFIX.to_string(),
        }
    }

    pub fn key_kind(mut self, key_kind: KeyKind) -> Self {
        self.key_kind = key_kind;
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn audit_logging(mut self, enabled: bool) -> Self {
        self.audit_logging = enabled;
        self
    }

    /// Appends an extra product token to the `User-Agent` header.
    pub fn secondary_user_agent(mut self, secondary: Option<&str>) -> Self {
        self.user_agent = match secondary.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => format!("{USER_AGENT_PREFIX} {s}"),
            None => USER_AGENT_PREFIX.to_string(),
        };
        self
    }

    pub fn endpoint(&self, kind: TelemetryKind) -> Option<&str> {
        self.endpoints.get(&kind).map(String::as_str)
    }

    /// Serializes the batch's current contents and builds the request.
    pub fn request_for(&self, batch: &Batch) -> Result<Request, EnvelopeError> {
        let endpoint = self
            .endpoint(batch.kind())
            .ok_or(EnvelopeError::NoEndpoint(batch.kind()))?
            .to_string();
        let json = to_json(batch)?;
        if self.audit_logging {
            tracing::debug!(
                batch_id = %batch.id(),
                kind = %batch.kind(),
                payload = %String::from_utf8_lossy(&json),
                "audit: sending payload"
            );
        }

        let mut headers = vec![
            (self.key_kind.header_name().to_string(), self.api_key.clone()),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), self.user_agent.clone()),
            ("X-Request-Id".to_string(), batch.id().to_string()),
        ];
        if batch.kind() == TelemetryKind::Spans {
            headers.push(("Data-Format".to_string(), "newrelic".to_string()));
            headers.push(("Data-Format-Version".to_string(), "1".to_string()));
        }
        let body = if self.compress {
            headers.push(("Content-Encoding".to_string(), "gzip".to_string()));
            gzip(&json)?
        } else {
            json
        };

        Ok(Request {
            endpoint,
            headers,
            body,
        })
    }
}

//! Errors surfaced synchronously by `Client::send`.
//!
//! Everything that happens after a batch is admitted (rejections, exhausted
//! retries, oversize payloads) is reported through the observer instead.

/// A batch could not enter the pipeline.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SendError {
    #[error("batch has no data points")]
    EmptyBatch,
    #[error("client is shutting down")]
    ShuttingDown,
    #[error("{limit} batches already in flight")]
    Saturated { limit: usize },
}

/// Invalid configuration detected before the client starts.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("retry.max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("{field} is not a valid number of seconds (got {value})")]
    BadDuration { field: &'static str, value: f64 },
    #[error("retry.multiplier must be >= 1.0 (got {0})")]
    BadMultiplier(f64),
    #[error("retry.max_delay_secs ({max}) is smaller than retry.base_delay_secs ({base})")]
    CapBelowBase { base: f64, max: f64 },
    #[error("max_concurrent_batches must be at least 1")]
    ZeroConcurrency,
    #[error("invalid {kind} endpoint {url:?}: {reason}")]
    BadEndpoint {
        kind: &'static str,
        url: String,
        reason: String,
    },
    #[error("no API key configured")]
    MissingApiKey,
    #[error("no tokio runtime available to run batch tasks")]
    NoRuntime,
}

//! Retry and backoff policy.
//!
//! This module encapsulates response classification (throttling, overload,
//! payload size, transport failures), exponential backoff and the per-batch
//! retry budget, so the sender loop only has to act on the decisions.

mod classify;
mod policy;
mod state;

pub use classify::{classify, classify_response, classify_status, retry_after, Disposition};
pub use policy::{Backoff, ExponentialBackoff, RetryLimits};
pub use state::{RetryState, SendAttempt};

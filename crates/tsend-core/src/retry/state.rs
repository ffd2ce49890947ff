//! Per-loop retry bookkeeping. Owned by exactly one sender loop, never shared.

use std::time::{Duration, Instant};

use super::policy::RetryLimits;
use crate::batch::Batch;

/// Attempt counter and elapsed time for one batch (or fragment).
#[derive(Debug, Clone)]
pub struct RetryState {
    attempt: u32,
    next_delay: Option<Duration>,
    started: Instant,
}

impl RetryState {
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(started: Instant) -> Self {
        Self {
            attempt: 1,
            next_delay: None,
            started,
        }
    }

    /// Current attempt number (1-based).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay scheduled before the current attempt, if it is a retry.
    pub fn next_delay(&self) -> Option<Duration> {
        self.next_delay
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// True when another attempt would exceed `limits`.
    pub fn exhausted(&self, limits: &RetryLimits) -> bool {
        if self.attempt >= limits.max_attempts {
            return true;
        }
        match limits.max_elapsed {
            Some(ceiling) => self.elapsed() >= ceiling,
            None => false,
        }
    }

    /// Record the delay taken and move on to the next attempt.
    pub fn advance(&mut self, delay: Duration) {
        self.next_delay = Some(delay);
        self.attempt += 1;
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of one attempt, handed to observers on retry.
#[derive(Debug, Clone, Copy)]
pub struct SendAttempt<'a> {
    pub batch: &'a Batch,
    /// The attempt that just failed (1-based).
    pub number: u32,
    /// Time since the first attempt of this batch or fragment.
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausts_at_max_attempts() {
        let limits = RetryLimits {
            max_attempts: 3,
            ..RetryLimits::default()
        };
        let mut s = RetryState::new();
        assert_eq!(s.attempt(), 1);
        assert!(!s.exhausted(&limits));
        s.advance(Duration::from_millis(5));
        assert!(!s.exhausted(&limits));
        s.advance(Duration::from_millis(10));
        assert_eq!(s.attempt(), 3);
        assert_eq!(s.next_delay(), Some(Duration::from_millis(10)));
        assert!(s.exhausted(&limits));
    }

    #[test]
    fn exhausts_after_elapsed_ceiling() {
        let limits = RetryLimits {
            max_attempts: 100,
            max_elapsed: Some(Duration::from_secs(5)),
            ..RetryLimits::default()
        };
        let past = Instant::now()
            .checked_sub(Duration::from_secs(6))
            .expect("monotonic clock far enough from boot");
        let s = RetryState::started_at(past);
        assert!(s.exhausted(&limits));
        assert!(!RetryState::new().exhausted(&limits));
    }

    #[test]
    fn single_attempt_budget_never_retries() {
        let limits = RetryLimits {
            max_attempts: 1,
            ..RetryLimits::default()
        };
        assert!(RetryState::new().exhausted(&limits));
    }
}

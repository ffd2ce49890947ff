use rand::Rng;
use std::time::Duration;

/// Computes the wait before the next attempt.
///
/// `attempt` is 1-based and names the attempt that just failed, so
/// `delay(1)` is the wait before attempt 2.
pub trait Backoff: Send + Sync {
    fn delay(&self, attempt: u32) -> Duration;
}

/// Exponential backoff with a cap and multiplicative jitter in `[0.5, 1.0]`.
///
/// Stateless: the delay depends only on the attempt number.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(15),
            jitter: true,
        }
    }
}

impl ExponentialBackoff {
    /// Un-jittered delay: `min(max_delay, base_delay * multiplier^(attempt-1))`.
    pub fn nominal(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let raw = self.base_delay.as_secs_f64() * self.multiplier.powi(exp);
        let cap = self.max_delay.as_secs_f64();
        // powi overflows to inf for large exponents; min() keeps it at the cap.
        // A cap near Duration::MAX does not survive the f64 round trip.
        Duration::try_from_secs_f64(raw.min(cap).max(0.0)).unwrap_or(self.max_delay)
    }
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let nominal = self.nominal(attempt);
        if !self.jitter {
            return nominal;
        }
        let factor: f64 = rand::thread_rng().gen_range(0.5..=1.0);
        Duration::try_from_secs_f64(nominal.as_secs_f64() * factor)
            .map_or(nominal, |d| d.min(nominal))
    }
}

/// Budget that bounds how long a batch may keep retrying.
#[derive(Debug, Clone, Copy)]
pub struct RetryLimits {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Stop retrying once this much time has passed since the first attempt.
    pub max_elapsed: Option<Duration>,
    /// Use the server's `Retry-After` instead of the computed backoff.
    pub honor_retry_after: bool,
    /// Upper bound applied to a server-requested wait.
    pub max_retry_after: Duration,
}

impl Default for RetryLimits {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            max_elapsed: None,
            honor_retry_after: true,
            max_retry_after: Duration::from_secs(60),
        }
    }
}

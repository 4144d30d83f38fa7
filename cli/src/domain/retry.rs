//! Retry policy shared by every HTTP path (JSON requests and raw uploads).

use std::time::Duration;

use crate::domain::error::ApiError;

/// Exponential backoff policy.
///
/// `max_attempts` counts the first try, so `3` means up to two retries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = self.multiplier.powi(i32::try_from(exponent).unwrap_or(i32::MAX));
        let scaled = self.initial_delay.as_secs_f64() * factor;
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(scaled)
        }
    }

    /// Whether a failure on attempt number `attempt` (1-based) is retried.
    #[must_use]
    pub fn should_retry(&self, attempt: u32, err: &ApiError) -> bool {
        attempt < self.max_attempts && err.is_transient()
    }
}

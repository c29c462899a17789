//! Bounded exponential backoff for transient failures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry policy for CAS conflicts and storage unavailability.
///
/// Exponential: `base_delay * 2^(attempt-1)`, capped at `max_delay`.
/// Never an unbounded spin; once `max_attempts` is exhausted the entry is
/// parked, not skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_attempts: u32,
    /// Base delay between retries.
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(25),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Calculate delay for a given attempt number (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;

        let factor = 1u64 << (attempt - 1).min(32);
        let delay_ms = base_ms.saturating_mul(factor).min(max_ms);

        Duration::from_millis(delay_ms)
    }

    /// Check if more retries are allowed after `attempt` failures.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

//! Retry policy for delivery attempt chains.
//!
//! Backoff grows strictly as a power of two of the base delay: retry `n`
//! waits `base * 2^n`. There is no jitter and no cap; the chain length is
//! bounded by [`RetryPolicy::max_retries`] instead.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry policy configuration for an attempt chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt before the chain gives up.
    ///
    /// A chain therefore makes `max_retries + 1` attempts.
    ///
    /// Default: 5
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff (in milliseconds).
    ///
    /// Default: 1000 (retry 0 waits 1s, retry 4 waits 16s)
    #[serde(default = "defaults::base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: defaults::max_retries(),
            base_delay_ms: defaults::base_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a failed attempt at retry index `retry` should be retried.
    #[must_use]
    pub const fn should_retry(&self, retry: u32) -> bool {
        retry < self.max_retries
    }

    /// Delay before retry `retry + 1` after a failure at index `retry`.
    ///
    /// `base * 2^retry`, saturating instead of overflowing.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let multiplier = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(multiplier))
    }

    /// Total attempts a chain makes before exhaustion.
    #[must_use]
    pub const fn attempts_per_chain(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Sum of every backoff wait in a fully failing chain.
    #[must_use]
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_retries).map(|retry| self.backoff(retry)).sum()
    }
}

mod defaults {
    pub const fn max_retries() -> u32 {
        5
    }

    pub const fn base_delay_ms() -> u64 {
        1000
    }
}

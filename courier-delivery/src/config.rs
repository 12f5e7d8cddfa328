//! Dispatcher configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    error::SystemError,
    policy::{FailoverPolicy, RetryPolicy},
};

const fn default_tick_interval() -> u64 {
    1000
}

const fn default_rate_limit() -> usize {
    5
}

/// Configuration for the dispatcher
///
/// Every field has a default, so an empty `()` RON block yields the stock
/// behaviour: one admission per second, five concurrent chains, six attempts
/// per chain with 1s..16s backoff, and a failover warning every third
/// failover onto the same provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Scheduler period (in milliseconds)
    ///
    /// At most one message is admitted per tick.
    ///
    /// Default: 1000
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Maximum number of attempt chains in flight at once
    ///
    /// Default: 5
    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,

    /// Retry behaviour within a single chain
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Failover tally threshold
    ///
    /// Default: 3
    #[serde(default)]
    pub failover_threshold: FailoverPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            rate_limit: default_rate_limit(),
            retry: RetryPolicy::default(),
            failover_threshold: FailoverPolicy::default(),
        }
    }
}

impl DispatchConfig {
    /// Scheduler period as a [`Duration`]
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Reject values the scheduler cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError::Configuration`] naming the offending field.
    pub fn validate(&self) -> Result<(), SystemError> {
        if self.tick_interval_ms == 0 {
            return Err(SystemError::Configuration(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.rate_limit == 0 {
            return Err(SystemError::Configuration(
                "rate_limit must be greater than zero".to_string(),
            ));
        }

        if self.failover_threshold.threshold == 0 {
            return Err(SystemError::Configuration(
                "failover_threshold must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

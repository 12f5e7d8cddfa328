//! Failover tally policy.
//!
//! Every time the provider pool advances, the tally of the provider it
//! advanced *to* is bumped. Once that tally reaches the threshold a warning
//! is raised and the tally starts over.

use serde::{Deserialize, Serialize};

/// Threshold configuration for failover warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailoverPolicy {
    /// Tally value at which a warning is emitted and the tally reset.
    pub threshold: u32,
}

impl Default for FailoverPolicy {
    fn default() -> Self {
        Self { threshold: 3 }
    }
}

impl FailoverPolicy {
    #[must_use]
    pub const fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    /// Bump `tally` for one failover.
    ///
    /// Returns `true` when the threshold was reached, in which case `tally`
    /// has already been reset to zero.
    pub const fn register(&self, tally: &mut u32) -> bool {
        *tally = tally.saturating_add(1);
        if *tally >= self.threshold {
            *tally = 0;
            true
        } else {
            false
        }
    }
}

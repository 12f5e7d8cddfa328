//! Delivery providers and the failover pool
//!
//! # Failover
//!
//! The pool keeps one cursor shared by every chain. A chain picks the
//! provider under the cursor when it is admitted and keeps it until it
//! finishes. When a chain exhausts its retries it advances the cursor, so
//! the *next* admission uses the following provider:
//!
//! ```text
//! providers: [primary, fallback]      cursor: 0
//!
//! chain(m) on primary ── 6 failures ──> advance()  cursor: 1, tally[1] += 1
//! chain(m) on fallback ── success
//! ```
//!
//! The tally bumped on `advance()` belongs to the provider being switched
//! *to*, not the one that failed. When a tally reaches the failover
//! threshold a warning is logged and that tally is reset.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    error::{ProviderError, SystemError},
    policy::FailoverPolicy,
    types::MessageId,
};

/// A delivery channel able to transmit one message
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human readable name used in logs
    fn name(&self) -> &str;

    /// Attempt delivery of a single message.
    ///
    /// May take arbitrarily long. Failures are reported, never panicked.
    async fn attempt_delivery(&self, message_id: &MessageId) -> Result<(), ProviderError>;
}

/// Summary of one [`ProviderPool::advance`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failover {
    /// Index the cursor moved away from
    pub from: usize,
    /// Index the cursor now points at
    pub to: usize,
    /// Tally of `to` after the update (zero if the threshold was reached)
    pub tally: u32,
    /// Whether this advance hit the threshold and emitted a warning
    pub threshold_reached: bool,
}

#[derive(Debug)]
struct PoolState {
    current: usize,
    failures: Vec<u32>,
}

/// Ordered providers with a shared selection cursor
pub struct ProviderPool {
    providers: Vec<Arc<dyn Provider>>,
    state: Mutex<PoolState>,
    policy: FailoverPolicy,
    warnings: AtomicU64,
}

impl fmt::Debug for ProviderPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderPool")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("state", &*self.state.lock())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ProviderPool {
    /// Build a pool starting at the first provider
    ///
    /// # Errors
    ///
    /// Returns [`SystemError::EmptyProviderPool`] if `providers` is empty.
    pub fn new(
        providers: Vec<Arc<dyn Provider>>,
        policy: FailoverPolicy,
    ) -> Result<Self, SystemError> {
        if providers.is_empty() {
            return Err(SystemError::EmptyProviderPool);
        }

        let failures = vec![0; providers.len()];

        Ok(Self {
            providers,
            state: Mutex::new(PoolState {
                current: 0,
                failures,
            }),
            policy,
            warnings: AtomicU64::new(0),
        })
    }

    /// The provider under the cursor, with its index
    pub fn current(&self) -> (usize, Arc<dyn Provider>) {
        let index = self.state.lock().current;
        (index, Arc::clone(&self.providers[index]))
    }

    /// Index of the provider under the cursor
    pub fn current_index(&self) -> usize {
        self.state.lock().current
    }

    /// Move the cursor to the next provider, wrapping around.
    ///
    /// Bumps the failure tally of the newly selected provider and warns
    /// once the tally reaches the failover threshold.
    pub fn advance(&self) -> Failover {
        let failover = {
            let mut state = self.state.lock();
            let from = state.current;
            let to = (from + 1) % self.providers.len();
            state.current = to;

            let threshold_reached = self.policy.register(&mut state.failures[to]);

            Failover {
                from,
                to,
                tally: state.failures[to],
                threshold_reached,
            }
        };

        if failover.threshold_reached {
            self.warnings.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                from = self.providers[failover.from].name(),
                to = self.providers[failover.to].name(),
                threshold = self.policy.threshold,
                "Switching providers due to failure threshold"
            );
        } else {
            tracing::info!(
                from = self.providers[failover.from].name(),
                to = self.providers[failover.to].name(),
                tally = failover.tally,
                "Failing over to next provider"
            );
        }

        failover
    }

    /// Failure tally for the provider at `index`
    pub fn failure_tally(&self, index: usize) -> Option<u32> {
        self.state.lock().failures.get(index).copied()
    }

    /// Number of threshold warnings emitted so far
    pub fn warnings_emitted(&self) -> u64 {
        self.warnings.load(Ordering::Relaxed)
    }

    /// Name of the provider at `index`
    pub fn name(&self, index: usize) -> Option<&str> {
        self.providers.get(index).map(|p| p.name())
    }

    /// Number of providers in the pool
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Always `false`; construction rejects empty pools
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

//! Retry engine: the per-message attempt/backoff state machine
//!
//! ```text
//!              ┌──────────── Ok ────────────> Sent { retries }
//!              │
//! Attempting(n) ── Err, n < max ──> BackingOff { n, 2^n × base } ──> Attempting(n + 1)
//!              │
//!              └── Err, n ≥ max ──> Exhausted { retries: n }
//! ```
//!
//! The provider is picked once, when the chain starts, and every retry in
//! the chain goes to that same provider. Exhaustion marks the record
//! `failed`, advances the provider pool and puts the identifier back on the
//! dispatch queue.

use std::{sync::Arc, time::Duration};

use courier_common::{internal, outgoing};
use tracing::{debug, warn};

use crate::{
    error::{DeliveryError, ProviderError},
    ledger::StatusLedger,
    policy::RetryPolicy,
    provider::ProviderPool,
    queue::DispatchQueue,
    types::{DeliveryStatus, MessageId},
};

/// State of one attempt chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainState {
    /// About to call the provider for retry index `n`
    Attempting(u32),
    /// Attempt `retry` failed; waiting `delay` before the next one
    BackingOff { retry: u32, delay: Duration },
    /// Delivered on retry index `retries`
    Sent { retries: u32 },
    /// Every attempt failed; `retries` is the index of the last one
    Exhausted {
        retries: u32,
        last_error: ProviderError,
    },
}

impl ChainState {
    /// The state following the attempt at retry index `retry`.
    #[must_use]
    pub fn after_attempt(
        retry: u32,
        result: Result<(), ProviderError>,
        policy: &RetryPolicy,
    ) -> Self {
        match result {
            Ok(()) => Self::Sent { retries: retry },
            Err(_) if policy.should_retry(retry) => Self::BackingOff {
                retry,
                delay: policy.backoff(retry),
            },
            Err(last_error) => Self::Exhausted {
                retries: retry,
                last_error,
            },
        }
    }

    /// Whether the chain stops in this state
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent { .. } | Self::Exhausted { .. })
    }
}

/// Drives attempt chains against the provider pool
#[derive(Debug, Clone)]
pub struct RetryEngine {
    ledger: StatusLedger,
    queue: DispatchQueue,
    pool: Arc<ProviderPool>,
    policy: RetryPolicy,
}

impl RetryEngine {
    #[must_use]
    pub const fn new(
        ledger: StatusLedger,
        queue: DispatchQueue,
        pool: Arc<ProviderPool>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            ledger,
            queue,
            pool,
            policy,
        }
    }

    /// Run one attempt chain for `message_id` to completion.
    ///
    /// Returns the retry index the message was delivered on.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Exhausted`] once every attempt failed. By
    /// then the record is `failed`, the pool has advanced and the identifier
    /// is back on the queue; the error only reports what happened.
    #[tracing::instrument(level = "debug", skip_all, fields(message_id = %message_id))]
    pub async fn run(&self, message_id: &MessageId) -> Result<u32, DeliveryError> {
        let (index, provider) = self.pool.current();
        let mut state = ChainState::Attempting(0);

        while !state.is_terminal() {
            state = match state {
                ChainState::Attempting(retry) => {
                    outgoing!(
                        provider = provider.name(),
                        provider_index = index,
                        attempt = retry,
                        "Attempting delivery"
                    );

                    let result = provider.attempt_delivery(message_id).await;
                    if let Err(e) = &result {
                        debug!(
                            provider = provider.name(),
                            attempt = retry,
                            error = %e,
                            "Delivery attempt failed"
                        );
                    }

                    ChainState::after_attempt(retry, result, &self.policy)
                }
                ChainState::BackingOff { retry, delay } => {
                    internal!(
                        retry = retry,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    ChainState::Attempting(retry + 1)
                }
                terminal @ (ChainState::Sent { .. } | ChainState::Exhausted { .. }) => terminal,
            };
        }

        match state {
            ChainState::Exhausted {
                retries,
                last_error,
            } => {
                self.ledger
                    .update(message_id, DeliveryStatus::Failed, retries);
                warn!(
                    provider = provider.name(),
                    retries = retries,
                    error = %last_error,
                    "Failed to send message after retries"
                );
                self.pool.advance();
                self.queue.push(message_id.clone());

                Err(DeliveryError::Exhausted {
                    message_id: message_id.clone(),
                    attempts: self.policy.attempts_per_chain(),
                    last_error,
                })
            }
            ChainState::Sent { retries } => {
                self.ledger
                    .update(message_id, DeliveryStatus::Sent, retries);
                outgoing!(
                    level = INFO,
                    provider = provider.name(),
                    retries = retries,
                    "Message sent successfully"
                );
                Ok(retries)
            }
            ChainState::Attempting(_) | ChainState::BackingOff { .. } => {
                unreachable!("chain loop only exits on a terminal state")
            }
        }
    }
}

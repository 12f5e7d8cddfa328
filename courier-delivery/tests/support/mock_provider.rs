//! Scriptable provider for dispatch tests
#![allow(dead_code)] // Test utility module - not all methods used in every test
//!
//! A [`MockProvider`] can:
//! - Succeed, fail forever, or fail a fixed number of times first
//! - Take a fixed (virtual) time per attempt
//! - Hold every attempt until the test releases it through a gate
//! - Track calls and peak concurrency for verification
//!
//! # Example
//!
//! ```rust,ignore
//! let gate = Arc::new(Semaphore::new(0));
//! let provider = MockProvider::builder("primary")
//!     .with_gate(Arc::clone(&gate))
//!     .build();
//!
//! // ... later, let exactly one attempt through
//! gate.add_permits(1);
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use courier_delivery::{MessageId, Provider, ProviderError};
use tokio::sync::Semaphore;

/// How attempts resolve once they are allowed to finish
#[derive(Debug, Clone, Copy)]
enum Outcome {
    Succeed,
    FailFirst(usize),
    FailAlways,
}

pub struct MockProviderBuilder {
    name: String,
    outcome: Outcome,
    latency: Duration,
    gate: Option<Arc<Semaphore>>,
}

impl MockProviderBuilder {
    pub fn failing_first(mut self, failures: usize) -> Self {
        self.outcome = Outcome::FailFirst(failures);
        self
    }

    pub fn failing_always(mut self) -> Self {
        self.outcome = Outcome::FailAlways;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Each attempt consumes one permit; a semaphore with zero permits
    /// holds every attempt until the test adds some.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn build(self) -> Arc<MockProvider> {
        Arc::new(MockProvider {
            name: self.name,
            outcome: self.outcome,
            latency: self.latency,
            gate: self.gate,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }
}

pub struct MockProvider {
    name: String,
    outcome: Outcome,
    latency: Duration,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MockProvider {
    pub fn builder(name: &str) -> MockProviderBuilder {
        MockProviderBuilder {
            name: name.to_string(),
            outcome: Outcome::Succeed,
            latency: Duration::ZERO,
            gate: None,
        }
    }

    /// Attempts started so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Attempts currently running
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of attempts that ran at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn as_provider(self: &Arc<Self>) -> Arc<dyn Provider> {
        Arc::clone(self) as Arc<dyn Provider>
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt_delivery(&self, message_id: &MessageId) -> Result<(), ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            match gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => {
                    self.active.fetch_sub(1, Ordering::SeqCst);
                    return Err(ProviderError::Unavailable("gate closed".to_string()));
                }
            }
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);

        match self.outcome {
            Outcome::Succeed => Ok(()),
            Outcome::FailFirst(failures) if call >= failures => Ok(()),
            Outcome::FailFirst(_) | Outcome::FailAlways => Err(ProviderError::Unavailable(
                format!("{} refused {message_id}", self.name),
            )),
        }
    }
}

//! Scheduler: tick-gated, capacity-gated admission
//!
//! Two independent limits must both hold for a message to be admitted:
//!
//! - **Tick gate**: at most one identifier leaves the queue per tick, so the
//!   queue drains at no more than one message per period.
//! - **Capacity gate**: at most `rate_limit` chains run at once.
//!
//! Ticks never wait for chains. A chain stuck in backoff only holds its own
//! slot; later ticks keep admitting while slots remain.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use courier_common::{Signal, internal};
use tokio::{
    sync::broadcast::{self, error::RecvError},
    time::MissedTickBehavior,
};
use tracing::{debug, error};

use crate::{engine::RetryEngine, queue::DispatchQueue, types::MessageId};

/// Releases an in-flight slot when the chain holding it ends, even if the
/// chain panics.
#[derive(Debug)]
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Periodic admission of queued messages into retry chains
#[derive(Debug, Clone)]
pub struct Scheduler {
    queue: DispatchQueue,
    engine: RetryEngine,
    in_flight: Arc<AtomicUsize>,
    stopped: Arc<AtomicBool>,
    rate_limit: usize,
    tick_interval: Duration,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        queue: DispatchQueue,
        engine: RetryEngine,
        rate_limit: usize,
        tick_interval: Duration,
    ) -> Self {
        Self {
            queue,
            engine,
            in_flight: Arc::new(AtomicUsize::new(0)),
            stopped: Arc::new(AtomicBool::new(false)),
            rate_limit,
            tick_interval,
        }
    }

    /// Number of chains currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Whether [`Scheduler::stop`] has been called
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Stop admitting. Running chains are left alone.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Reserve a slot if one is free.
    fn try_reserve(&self) -> bool {
        self.in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < self.rate_limit).then_some(current + 1)
            })
            .is_ok()
    }

    /// Run one admission tick.
    ///
    /// Admits at most one identifier and starts its chain on the current
    /// Tokio runtime. Returns the admitted identifier, if any.
    pub fn tick(&self) -> Option<MessageId> {
        if self.is_stopped() {
            return None;
        }

        if self.queue.is_empty() {
            return None;
        }

        if !self.try_reserve() {
            internal!(
                in_flight = self.in_flight(),
                rate_limit = self.rate_limit,
                "At capacity, deferring admission"
            );
            return None;
        }

        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        let message_id = self.queue.pop()?;

        debug!(
            message_id = %message_id,
            in_flight = self.in_flight(),
            "Admitting message"
        );

        let engine = self.engine.clone();
        let admitted = message_id.clone();

        tokio::spawn(async move {
            let _guard = guard;
            match engine.run(&message_id).await {
                Ok(retries) => {
                    internal!(message_id = %message_id, retries = retries, "Chain finished");
                }
                Err(e) => {
                    internal!(level = DEBUG, message_id = %message_id, error = %e, "Chain exhausted");
                }
            }
        });

        Some(admitted)
    }

    /// Run the tick loop until a shutdown signal arrives.
    ///
    /// The first tick happens one full period after the loop starts. Chains
    /// still running when the loop exits keep running.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn serve(&self, mut shutdown: broadcast::Receiver<Signal>) {
        internal!(
            tick_ms = u64::try_from(self.tick_interval.as_millis()).unwrap_or(u64::MAX),
            rate_limit = self.rate_limit,
            "Scheduler starting"
        );

        let mut timer = tokio::time::interval(self.tick_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Skip the first tick to avoid immediate execution
        timer.tick().await;

        loop {
            if self.is_stopped() {
                break;
            }

            tokio::select! {
                _ = timer.tick() => {
                    self.tick();
                }
                sig = shutdown.recv() => {
                    match sig {
                        Ok(Signal::Shutdown | Signal::Finalised) => {
                            internal!("Scheduler received shutdown signal");
                            self.stop();
                            break;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "Scheduler shutdown channel lagged");
                        }
                        Err(RecvError::Closed) => {
                            error!("Scheduler shutdown channel closed");
                            self.stop();
                            break;
                        }
                    }
                }
            }
        }

        internal!(
            level = DEBUG,
            in_flight = self.in_flight(),
            "Scheduler stopped; in-flight chains continue"
        );
    }
}

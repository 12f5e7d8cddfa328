//! Dispatcher: the submission API over ledger, queue, pool and scheduler

use std::sync::Arc;

use courier_common::{Signal, internal};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info};

use crate::{
    config::DispatchConfig,
    engine::RetryEngine,
    error::DeliveryError,
    ledger::StatusLedger,
    notifier::EventNotifier,
    provider::{Provider, ProviderPool},
    queue::DispatchQueue,
    scheduler::Scheduler,
    types::{DeliveryRecord, DeliveryStatus, DispatchStats, MessageId},
};

#[derive(Debug)]
struct DispatchCore {
    config: DispatchConfig,
    ledger: StatusLedger,
    queue: DispatchQueue,
    pool: Arc<ProviderPool>,
    notifier: EventNotifier,
    scheduler: Scheduler,
    shutdown: broadcast::Sender<Signal>,
}

/// Outbound message dispatcher
///
/// Cloning is cheap; every clone drives the same queue, ledger and pool.
///
/// ```rust,ignore
/// let dispatcher = Dispatcher::new(DispatchConfig::default(), providers)?;
/// dispatcher.on_queued(|id| println!("queued {id}"));
/// let scheduler = dispatcher.spawn();
///
/// dispatcher.submit("user@example.com");
/// // ... later
/// dispatcher.get_status("user@example.com");
/// dispatcher.shutdown();
/// ```
#[derive(Debug, Clone)]
pub struct Dispatcher {
    core: Arc<DispatchCore>,
}

impl Dispatcher {
    /// Build a dispatcher. The scheduler does not run until
    /// [`Dispatcher::spawn`] or [`Dispatcher::serve`] is called.
    ///
    /// # Errors
    ///
    /// Returns a system error if the configuration is invalid or
    /// `providers` is empty.
    pub fn new(
        config: DispatchConfig,
        providers: Vec<Arc<dyn Provider>>,
    ) -> Result<Self, DeliveryError> {
        config.validate()?;

        let ledger = StatusLedger::new();
        let queue = DispatchQueue::new();
        let pool = Arc::new(ProviderPool::new(providers, config.failover_threshold)?);
        let engine = RetryEngine::new(
            ledger.clone(),
            queue.clone(),
            Arc::clone(&pool),
            config.retry,
        );
        let scheduler = Scheduler::new(
            queue.clone(),
            engine,
            config.rate_limit,
            config.tick_interval(),
        );
        let (shutdown, _) = broadcast::channel(16);

        internal!(
            providers = pool.len(),
            rate_limit = config.rate_limit,
            max_retries = config.retry.max_retries,
            chain_backoff_ms =
                u64::try_from(config.retry.total_backoff().as_millis()).unwrap_or(u64::MAX),
            "Dispatcher initialised"
        );

        Ok(Self {
            core: Arc::new(DispatchCore {
                config,
                ledger,
                queue,
                pool,
                notifier: EventNotifier::new(),
                scheduler,
                shutdown,
            }),
        })
    }

    /// Submit a message for delivery.
    ///
    /// The first submission of an identifier creates a pending record,
    /// queues it and notifies queued observers. Later submissions of the
    /// same identifier do nothing. Returns `true` when the message was
    /// newly queued.
    pub fn submit(&self, message_id: impl Into<MessageId>) -> bool {
        let message_id = message_id.into();

        if !self.core.ledger.insert_pending(&message_id) {
            debug!(message_id = %message_id, "Message already queued or sent");
            return false;
        }

        self.core.queue.push(message_id.clone());
        self.core.notifier.notify_queued(&message_id);
        info!(
            message_id = %message_id,
            observers = self.core.notifier.observer_count(),
            "Message queued"
        );

        true
    }

    /// Current delivery record of a message
    pub fn get_status(&self, message_id: &str) -> Option<DeliveryRecord> {
        self.core.ledger.get(message_id)
    }

    /// Register an observer fired whenever a message is newly queued
    pub fn on_queued<F>(&self, callback: F)
    where
        F: Fn(&MessageId) + Send + Sync + 'static,
    {
        self.core.notifier.on_queued(callback);
    }

    /// Run one admission tick by hand. See [`Scheduler::tick`].
    pub fn tick(&self) -> Option<MessageId> {
        self.core.scheduler.tick()
    }

    /// Run the scheduler until `shutdown` delivers a signal or
    /// [`Dispatcher::shutdown`] is called.
    pub async fn serve(&self, shutdown: broadcast::Receiver<Signal>) {
        self.core.scheduler.serve(shutdown).await;
    }

    /// Start the scheduler on the current Tokio runtime.
    pub fn spawn(&self) -> JoinHandle<()> {
        let receiver = self.core.shutdown.subscribe();
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.serve(receiver).await })
    }

    /// Stop admitting new work.
    ///
    /// In-flight chains are neither drained nor cancelled; they run to
    /// completion and may still re-queue their message. Calling this more
    /// than once is harmless.
    pub fn shutdown(&self) {
        if self.core.scheduler.is_stopped() {
            return;
        }

        internal!(
            level = INFO,
            in_flight = self.core.scheduler.in_flight(),
            queued = self.core.queue.len(),
            "Dispatcher shutting down"
        );
        self.core.scheduler.stop();
        // No receiver just means the scheduler was never started.
        let _ = self.core.shutdown.send(Signal::Shutdown);
    }

    /// Whether [`Dispatcher::shutdown`] has been called
    pub fn is_shut_down(&self) -> bool {
        self.core.scheduler.is_stopped()
    }

    /// Number of chains currently running
    pub fn in_flight(&self) -> usize {
        self.core.scheduler.in_flight()
    }

    /// Number of identifiers waiting for admission
    pub fn queue_len(&self) -> usize {
        self.core.queue.len()
    }

    /// Identifiers waiting for admission, front first
    pub fn queued(&self) -> Vec<MessageId> {
        self.core.queue.snapshot()
    }

    /// The provider pool backing this dispatcher
    pub fn provider_pool(&self) -> &ProviderPool {
        &self.core.pool
    }

    /// The status ledger backing this dispatcher
    pub fn ledger(&self) -> &StatusLedger {
        &self.core.ledger
    }

    /// The configuration this dispatcher was built with
    pub fn config(&self) -> &DispatchConfig {
        &self.core.config
    }

    /// Point-in-time counters
    pub fn stats(&self) -> DispatchStats {
        let ledger = &self.core.ledger;
        DispatchStats {
            queued: self.core.queue.len(),
            in_flight: self.core.scheduler.in_flight(),
            pending: ledger.count_with_status(DeliveryStatus::Pending),
            sent: ledger.count_with_status(DeliveryStatus::Sent),
            failed: ledger.count_with_status(DeliveryStatus::Failed),
            current_provider: self.core.pool.current_index(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ProviderError;

    struct Accepting;

    #[async_trait]
    impl Provider for Accepting {
        fn name(&self) -> &str {
            "accepting"
        }

        async fn attempt_delivery(&self, _message_id: &MessageId) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            DispatchConfig::default(),
            vec![Arc::new(Accepting) as Arc<dyn Provider>],
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_empty_pool() {
        let err = Dispatcher::new(DispatchConfig::default(), Vec::new()).unwrap_err();
        assert!(err.is_system());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = DispatchConfig {
            rate_limit: 0,
            ..DispatchConfig::default()
        };
        let err =
            Dispatcher::new(config, vec![Arc::new(Accepting) as Arc<dyn Provider>]).unwrap_err();
        assert!(err.is_system());
    }

    #[test]
    fn test_submit_twice_creates_one_record_and_one_event() {
        let dispatcher = dispatcher();
        let events = Arc::new(AtomicUsize::new(0));
        {
            let events = Arc::clone(&events);
            dispatcher.on_queued(move |_| {
                events.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(dispatcher.submit("a@example.com"));
        assert!(!dispatcher.submit("a@example.com"));

        assert_eq!(events.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.queue_len(), 1);
        assert_eq!(dispatcher.ledger().len(), 1);

        let record = dispatcher.get_status("a@example.com").unwrap();
        assert_eq!(record.status, DeliveryStatus::Pending);
        assert_eq!(record.retry_count, 0);
    }

    #[test]
    fn test_unknown_status() {
        assert!(dispatcher().get_status("nobody").is_none());
    }

    #[test]
    fn test_stats_before_start() {
        let dispatcher = dispatcher();
        dispatcher.submit("a");
        dispatcher.submit("b");

        assert_eq!(
            dispatcher.stats(),
            DispatchStats {
                queued: 2,
                in_flight: 0,
                pending: 2,
                sent: 0,
                failed: 0,
                current_provider: 0,
            }
        );
    }

    #[test]
    fn test_shutdown_is_idempotent_without_scheduler() {
        let dispatcher = dispatcher();
        assert!(!dispatcher.is_shut_down());
        dispatcher.shutdown();
        dispatcher.shutdown();
        assert!(dispatcher.is_shut_down());
    }
}

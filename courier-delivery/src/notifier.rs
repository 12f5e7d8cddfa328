//! Observer hooks fired on submission

use std::{fmt, sync::Arc};

use parking_lot::RwLock;

use crate::types::MessageId;

type QueuedCallback = Arc<dyn Fn(&MessageId) + Send + Sync>;

/// Registry of "message queued" observers.
///
/// Observers run synchronously on the submitting thread, in registration
/// order, once per newly created record. The registry lock is released
/// before callbacks run, so an observer may register further observers.
#[derive(Clone, Default)]
pub struct EventNotifier {
    queued: Arc<RwLock<Vec<QueuedCallback>>>,
}

impl fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventNotifier")
            .field("queued_observers", &self.queued.read().len())
            .finish()
    }
}

impl EventNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for newly queued messages
    pub fn on_queued<F>(&self, callback: F)
    where
        F: Fn(&MessageId) + Send + Sync + 'static,
    {
        self.queued.write().push(Arc::new(callback));
    }

    /// Invoke every queued observer with `message_id`
    pub fn notify_queued(&self, message_id: &MessageId) {
        let observers = self.queued.read().clone();
        for observer in &observers {
            observer(message_id);
        }
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.queued.read().len()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn test_observers_run_in_registration_order() {
        let notifier = EventNotifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            notifier.on_queued(move |id| seen.lock().push(format!("{tag}:{id}")));
        }

        notifier.notify_queued(&MessageId::new("m"));

        assert_eq!(
            *seen.lock(),
            vec!["first:m".to_string(), "second:m".to_string(), "third:m".to_string()]
        );
        assert_eq!(notifier.observer_count(), 3);
    }

    #[test]
    fn test_observer_may_register_another() {
        let notifier = EventNotifier::new();
        let inner = notifier.clone();
        notifier.on_queued(move |_| inner.on_queued(|_| {}));

        notifier.notify_queued(&MessageId::new("m"));
        assert_eq!(notifier.observer_count(), 2);
    }

    #[test]
    fn test_no_observers_is_fine() {
        EventNotifier::new().notify_queued(&MessageId::new("m"));
    }
}

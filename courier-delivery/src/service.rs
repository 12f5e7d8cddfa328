//! Read-side query surface over a running dispatcher
//!
//! Host interfaces (a CLI status dump, a future control socket) depend on
//! this trait rather than on [`Dispatcher`] directly.

use crate::{
    dispatcher::Dispatcher,
    types::{DeliveryRecord, DeliveryStatus},
};

/// Query and pruning operations on dispatch state
///
/// # Example
///
/// ```rust,ignore
/// fn report(service: &dyn DispatchQueryService) -> usize {
///     service.list_records(Some(DeliveryStatus::Failed)).len()
/// }
/// ```
pub trait DispatchQueryService: Send + Sync {
    /// Number of identifiers waiting for admission
    fn queue_len(&self) -> usize;

    /// Number of chains currently running
    fn in_flight(&self) -> usize;

    /// Record for a single message, `None` if it was never submitted
    fn get_record(&self, message_id: &str) -> Option<DeliveryRecord>;

    /// Every record, optionally restricted to one status
    fn list_records(&self, status: Option<DeliveryStatus>) -> Vec<DeliveryRecord>;

    /// Drop the record for `message_id` once it has been delivered.
    ///
    /// Returns `None` for unknown identifiers and for records still
    /// `pending` or `failed`. A pruned identifier may be submitted again.
    fn remove(&self, message_id: &str) -> Option<DeliveryRecord>;

    /// Index and name of the provider new chains will use
    fn current_provider(&self) -> (usize, String);
}

impl DispatchQueryService for Dispatcher {
    fn queue_len(&self) -> usize {
        Self::queue_len(self)
    }

    fn in_flight(&self) -> usize {
        Self::in_flight(self)
    }

    fn get_record(&self, message_id: &str) -> Option<DeliveryRecord> {
        self.get_status(message_id)
    }

    fn list_records(&self, status: Option<DeliveryStatus>) -> Vec<DeliveryRecord> {
        let mut records = status.map_or_else(
            || self.ledger().all_records(),
            |status| self.ledger().records_with_status(status),
        );
        records.sort_by(|a, b| a.message_id.cmp(&b.message_id));
        records
    }

    fn remove(&self, message_id: &str) -> Option<DeliveryRecord> {
        let removed = self.ledger().remove(message_id);
        if removed.is_some() {
            tracing::info!(message_id, "Delivery record pruned");
        } else if self.ledger().contains(message_id) {
            tracing::debug!(message_id, "Refusing to prune undelivered record");
        }
        removed
    }

    fn current_provider(&self) -> (usize, String) {
        let pool = self.provider_pool();
        let index = pool.current_index();
        let name = pool.name(index).unwrap_or_default().to_string();
        (index, name)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        config::DispatchConfig, error::ProviderError, provider::Provider, types::MessageId,
    };

    struct Primary;

    #[async_trait]
    impl Provider for Primary {
        fn name(&self) -> &str {
            "primary"
        }

        async fn attempt_delivery(&self, _message_id: &MessageId) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    fn service() -> Box<dyn DispatchQueryService> {
        let dispatcher = Dispatcher::new(
            DispatchConfig::default(),
            vec![Arc::new(Primary) as Arc<dyn Provider>],
        )
        .unwrap();
        for id in ["c", "a", "b"] {
            dispatcher.submit(id);
        }
        dispatcher.ledger().update(&MessageId::new("b"), DeliveryStatus::Sent, 1);
        Box::new(dispatcher)
    }

    #[test]
    fn test_list_records_sorted_and_filtered() {
        let service = service();

        let all: Vec<_> = service
            .list_records(None)
            .into_iter()
            .map(|r| r.message_id.to_string())
            .collect();
        assert_eq!(all, vec!["a", "b", "c"]);

        let sent = service.list_records(Some(DeliveryStatus::Sent));
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message_id.as_str(), "b");
    }

    #[test]
    fn test_remove_prunes_record() {
        let service = service();
        assert!(service.remove("b").is_some());
        assert!(service.get_record("b").is_none());
        assert!(service.remove("b").is_none());
        assert_eq!(service.queue_len(), 3);
    }

    #[test]
    fn test_remove_refuses_pending_record() {
        let service = service();
        assert!(service.remove("a").is_none());
        assert_eq!(
            service.get_record("a").map(|r| r.status),
            Some(DeliveryStatus::Pending)
        );
    }

    #[test]
    fn test_current_provider() {
        let service = service();
        assert_eq!(service.current_provider(), (0, String::from("primary")));
        assert_eq!(service.in_flight(), 0);
    }
}

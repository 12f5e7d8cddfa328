//! Type definitions for the status ledger and dispatch queue

use std::{borrow::Borrow, fmt, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque, caller-supplied message identifier.
///
/// Cloning is cheap (`Arc<str>`), so identifiers can be handed to the queue,
/// the ledger and every in-flight chain without copying the underlying string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Arc<str>);

impl MessageId {
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl Borrow<str> for MessageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for MessageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Delivery status of a message as seen by external observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Submitted, waiting in the queue or currently being attempted
    Pending,
    /// Accepted by a provider
    Sent,
    /// The last attempt chain exhausted its retry budget; the message has
    /// been put back on the queue
    Failed,
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        })
    }
}

/// Information about a message tracked by the status ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// The caller's message identifier
    pub message_id: MessageId,
    /// Current delivery status
    pub status: DeliveryStatus,
    /// Retry index reached by the most recent chain (0 = first attempt)
    pub retry_count: u32,
    /// When this record last changed
    pub last_updated: DateTime<Utc>,
}

impl DeliveryRecord {
    /// Create a new pending record
    #[must_use]
    pub fn pending(message_id: MessageId) -> Self {
        Self {
            message_id,
            status: DeliveryStatus::Pending,
            retry_count: 0,
            last_updated: Utc::now(),
        }
    }

    /// Move the record to `status`, stamping the update time.
    pub fn transition(&mut self, status: DeliveryStatus, retry_count: u32) {
        self.status = status;
        self.retry_count = retry_count;
        self.last_updated = Utc::now();
    }

    /// Whether the record reached a state no chain will change again.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self.status, DeliveryStatus::Sent)
    }
}

/// Point-in-time counters for the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Identifiers waiting for admission
    pub queued: usize,
    /// Chains currently running
    pub in_flight: usize,
    /// Records in the `Pending` state
    pub pending: usize,
    /// Records in the `Sent` state
    pub sent: usize,
    /// Records in the `Failed` state
    pub failed: usize,
    /// Index of the provider new chains will use
    pub current_provider: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_display_and_eq() {
        let a = MessageId::new("user@example.com");
        let b = MessageId::from(String::from("user@example.com"));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "user@example.com");
        assert_eq!(a.as_str(), "user@example.com");
    }

    #[test]
    fn test_record_transition_updates_fields() {
        let mut record = DeliveryRecord::pending(MessageId::new("a"));
        let created = record.last_updated;
        assert_eq!(record.status, DeliveryStatus::Pending);
        assert_eq!(record.retry_count, 0);
        assert!(!record.is_delivered());

        record.transition(DeliveryStatus::Sent, 2);
        assert_eq!(record.status, DeliveryStatus::Sent);
        assert_eq!(record.retry_count, 2);
        assert!(record.last_updated >= created);
        assert!(record.is_delivered());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(DeliveryStatus::Pending.to_string(), "pending");
        assert_eq!(DeliveryStatus::Sent.to_string(), "sent");
        assert_eq!(DeliveryStatus::Failed.to_string(), "failed");
    }
}

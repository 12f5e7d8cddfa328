//! Status ledger: per-message delivery records

use std::{borrow::Borrow, hash::Hash, sync::Arc};

use dashmap::{DashMap, mapref::entry::Entry};

use crate::types::{DeliveryRecord, DeliveryStatus, MessageId};

/// Tracks the current [`DeliveryRecord`] of every submitted message
#[derive(Debug, Clone, Default)]
pub struct StatusLedger {
    /// Map of message IDs to delivery records (lock-free concurrent access)
    pub(crate) records: Arc<DashMap<MessageId, DeliveryRecord>>,
}

impl StatusLedger {
    /// Create a new empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pending record for `message_id` unless one already exists.
    ///
    /// Returns `true` if a record was created. The check and the insert
    /// happen under the same shard lock, so two concurrent submissions of
    /// the same identifier create exactly one record.
    pub fn insert_pending(&self, message_id: &MessageId) -> bool {
        match self.records.entry(message_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(DeliveryRecord::pending(message_id.clone()));
                true
            }
        }
    }

    /// Get the record for a message
    pub fn get<Q>(&self, message_id: &Q) -> Option<DeliveryRecord>
    where
        MessageId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.records
            .get(message_id)
            .map(|entry| entry.value().clone())
    }

    /// Check whether a record exists
    pub fn contains<Q>(&self, message_id: &Q) -> bool
    where
        MessageId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.records.contains_key(message_id)
    }

    /// Update the status and retry count of a message
    ///
    /// Unknown identifiers are ignored; a record pruned externally while its
    /// chain was running stays pruned.
    pub fn update(&self, message_id: &MessageId, status: DeliveryStatus, retry_count: u32) {
        if let Some(mut entry) = self.records.get_mut(message_id) {
            entry.value_mut().transition(status, retry_count);
        }
    }

    /// Remove a delivered record (external pruning)
    ///
    /// Records still `pending` or `failed` belong to a queued or running
    /// chain and are kept; dropping one would let a resubmission start a
    /// second chain for the same identifier.
    pub fn remove<Q>(&self, message_id: &Q) -> Option<DeliveryRecord>
    where
        MessageId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.records
            .remove_if(message_id, |_, record| record.is_delivered())
            .map(|(_, record)| record)
    }

    /// Get the number of tracked records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get every record
    pub fn all_records(&self) -> Vec<DeliveryRecord> {
        self.records
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Get every record currently in `status`
    pub fn records_with_status(&self, status: DeliveryStatus) -> Vec<DeliveryRecord> {
        self.records
            .iter()
            .filter(|entry| entry.value().status == status)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Count records currently in `status`
    pub fn count_with_status(&self, status: DeliveryStatus) -> usize {
        self.records
            .iter()
            .filter(|entry| entry.value().status == status)
            .count()
    }
}

//! Dispatch queue: identifiers awaiting admission

use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;

use crate::types::MessageId;

/// FIFO of message identifiers waiting for the scheduler.
///
/// An identifier can appear again after its chain exhausted and it was
/// recycled, but the scheduler never admits one that is already in flight
/// because exhausted chains only push back after they stop running.
#[derive(Debug, Clone, Default)]
pub struct DispatchQueue {
    pub(crate) entries: Arc<Mutex<VecDeque<MessageId>>>,
}

impl DispatchQueue {
    /// Create a new empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an identifier to the back of the queue
    pub fn push(&self, message_id: MessageId) {
        self.entries.lock().push_back(message_id);
    }

    /// Take the identifier at the front of the queue
    pub fn pop(&self) -> Option<MessageId> {
        self.entries.lock().pop_front()
    }

    /// Get the number of waiting identifiers
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Copy of the queue in admission order
    pub fn snapshot(&self) -> Vec<MessageId> {
        self.entries.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = DispatchQueue::new();
        assert!(queue.is_empty());

        queue.push(MessageId::new("first"));
        queue.push(MessageId::new("second"));
        queue.push(MessageId::new("third"));

        assert_eq!(queue.len(), 3);
        assert_eq!(
            queue.snapshot(),
            vec![
                MessageId::new("first"),
                MessageId::new("second"),
                MessageId::new("third")
            ]
        );

        assert_eq!(queue.pop(), Some(MessageId::new("first")));
        assert_eq!(queue.pop(), Some(MessageId::new("second")));
        assert_eq!(queue.pop(), Some(MessageId::new("third")));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_recycled_identifier_goes_to_back() {
        let queue = DispatchQueue::new();
        queue.push(MessageId::new("a"));
        queue.push(MessageId::new("b"));

        let head = queue.pop().unwrap();
        queue.push(head);

        assert_eq!(
            queue.snapshot(),
            vec![MessageId::new("b"), MessageId::new("a")]
        );
    }

    #[test]
    fn test_clones_share_storage() {
        let queue = DispatchQueue::new();
        let other = queue.clone();
        other.push(MessageId::new("shared"));
        assert_eq!(queue.len(), 1);
    }
}

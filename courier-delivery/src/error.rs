//! Typed error handling for dispatch operations.
//!
//! This module distinguishes between:
//! - Provider failures - a single attempt failed, retried with backoff
//! - Exhaustion - a whole attempt chain failed, the message is recycled
//! - System errors - configuration faults detected at construction

use thiserror::Error;

use crate::types::MessageId;

/// Failure reported by a provider for one delivery attempt.
///
/// Every variant is treated as transient: the retry engine backs off and
/// tries again with the same provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider refused the message.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached or is overloaded.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// The provider did not answer in time.
    #[error("Timed out: {0}")]
    Timeout(String),
}

/// Top-level dispatch error type.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Every attempt in a chain failed.
    ///
    /// Produced as a chain outcome for logging; the message itself is put
    /// back on the queue and never surfaced to the submitter as an error.
    #[error("Retry budget exhausted for {message_id} after {attempts} attempts")]
    Exhausted {
        message_id: MessageId,
        attempts: u32,
        #[source]
        last_error: ProviderError,
    },

    /// System-level error (configuration faults).
    #[error("System error: {0}")]
    System(#[from] SystemError),
}

/// System-level errors that indicate a misconfigured dispatcher.
#[derive(Debug, Error)]
pub enum SystemError {
    /// The provider pool was built without any providers.
    #[error("Provider pool must contain at least one provider")]
    EmptyProviderPool,

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DeliveryError {
    /// Returns `true` if this error came from an exhausted attempt chain.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Returns `true` if this is a system error.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        matches!(self, Self::System(_))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_exhausted_error_keeps_last_failure() {
        let error = DeliveryError::Exhausted {
            message_id: MessageId::new("a@example.com"),
            attempts: 6,
            last_error: ProviderError::Unavailable("connection refused".to_string()),
        };
        assert!(error.is_exhausted());
        assert!(!error.is_system());
        assert_eq!(
            error.to_string(),
            "Retry budget exhausted for a@example.com after 6 attempts"
        );
        assert_eq!(
            error.source().map(ToString::to_string).as_deref(),
            Some("Provider unavailable: connection refused")
        );
    }

    #[test]
    fn test_system_error_display() {
        let error = DeliveryError::from(SystemError::EmptyProviderPool);
        assert!(error.is_system());
        assert_eq!(
            error.to_string(),
            "System error: Provider pool must contain at least one provider"
        );

        let error = DeliveryError::from(SystemError::Configuration(
            "rate_limit must be greater than zero".to_string(),
        ));
        assert_eq!(
            error.to_string(),
            "System error: Configuration error: rate_limit must be greater than zero"
        );
    }
}

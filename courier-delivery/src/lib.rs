//! Outbound message dispatch for courier
//!
//! Accepts message identifiers, queues them, admits them at a controlled
//! rate and drives each through a bounded retry chain against a pool of
//! interchangeable providers:
//!
//! ```text
//! submit ──> StatusLedger (pending) ──> DispatchQueue ──> Scheduler (1 per tick, ≤ rate_limit)
//!                                            ^                   │
//!                                            │                   v
//!                                            └── exhausted ── RetryEngine ──> Provider
//! ```
//!
//! [`Dispatcher`] ties the pieces together and is the only entry point most
//! hosts need.

mod config;
mod dispatcher;
mod engine;
mod error;
mod ledger;
mod notifier;
pub mod policy;
mod provider;
mod queue;
mod scheduler;
mod service;
mod types;

pub use config::DispatchConfig;
pub use dispatcher::Dispatcher;
pub use engine::{ChainState, RetryEngine};
pub use error::{DeliveryError, ProviderError, SystemError};
pub use ledger::StatusLedger;
pub use notifier::EventNotifier;
pub use policy::{FailoverPolicy, RetryPolicy};
pub use provider::{Failover, Provider, ProviderPool};
pub use queue::DispatchQueue;
pub use scheduler::Scheduler;
pub use service::DispatchQueryService;
pub use types::{DeliveryRecord, DeliveryStatus, DispatchStats, MessageId};

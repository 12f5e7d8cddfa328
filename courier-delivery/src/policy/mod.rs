//! Policy abstractions for dispatch operations.
//!
//! ## Policies
//!
//! - [`RetryPolicy`]: how many attempts a chain makes and how long it backs off
//! - [`FailoverPolicy`]: when repeated failovers onto a provider raise a warning

pub mod failover;
pub mod retry;

pub use failover::FailoverPolicy;
pub use retry::RetryPolicy;

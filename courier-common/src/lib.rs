pub mod logging;

use serde::{Deserialize, Serialize};
pub use tracing;

/// Lifecycle signals broadcast to long-running components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    /// Stop accepting new work.
    Shutdown,
    /// Every component has finished shutting down.
    Finalised,
}

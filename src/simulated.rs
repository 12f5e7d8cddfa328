use std::time::Duration;

use async_trait::async_trait;
use courier_delivery::{MessageId, Provider, ProviderError};
use rand::Rng;
use serde::Deserialize;

const fn default_latency_ms() -> u64 {
    50
}

/// A provider configured in `courier.config.ron`
///
/// ```ron
/// (name: "primary", failure_rate: 0.5, latency_ms: 100)
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulatedProviderConfig {
    pub name: String,
    /// Probability in `[0, 1]` that an attempt fails
    #[serde(default)]
    pub failure_rate: f64,
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
}

impl SimulatedProviderConfig {
    /// # Errors
    ///
    /// Fails if `failure_rate` lies outside `[0, 1]`.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.failure_rate) {
            anyhow::bail!(
                "Provider {} has failure_rate {}, expected a value between 0 and 1",
                self.name,
                self.failure_rate
            );
        }

        Ok(())
    }
}

/// Stand-in provider that fails at random
#[derive(Debug, Clone)]
pub struct SimulatedProvider {
    config: SimulatedProviderConfig,
}

impl SimulatedProvider {
    #[must_use]
    pub const fn new(config: SimulatedProviderConfig) -> Self {
        Self { config }
    }

    fn roll(&self) -> bool {
        let rate = self.config.failure_rate;
        if rate.is_nan() {
            return false;
        }
        rand::rng().random_bool(rate.clamp(0.0, 1.0))
    }
}

#[async_trait]
impl Provider for SimulatedProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn attempt_delivery(&self, message_id: &MessageId) -> Result<(), ProviderError> {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        if self.roll() {
            return Err(ProviderError::Unavailable(format!(
                "Simulated failure delivering {message_id}"
            )));
        }

        Ok(())
    }
}

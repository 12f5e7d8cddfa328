use std::{
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
};

use courier_common::{Signal, internal, logging};
use courier_delivery::{DispatchConfig, DispatchQueryService, Dispatcher, Provider};
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::simulated::{SimulatedProvider, SimulatedProviderConfig};

pub const CONFIG_ENV: &str = "COURIER_CONFIG";

pub const DEFAULT_CONFIG_PATHS: [&str; 2] =
    ["./courier.config.ron", "/etc/courier/courier.config.ron"];

#[derive(Debug, Default, Deserialize)]
pub struct Courier {
    #[serde(default)]
    delivery: DispatchConfig,
    #[serde(alias = "provider", default)]
    providers: Vec<SimulatedProviderConfig>,
}

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

#[tracing::instrument(level = tracing::Level::TRACE)]
async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!("CTRL+C entered, shutting down");
        }
        _ = terminate.recv() => {
            internal!("Terminate Signal received, shutting down");
        }
    };

    SHUTDOWN_BROADCAST
        .send(Signal::Shutdown)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Interrupted, e.to_string()))?;

    Ok(())
}

/// Find the configuration file using the following precedence:
/// 1. `explicit` (the `--config` flag, or the `COURIER_CONFIG` environment
///    variable when the flag is absent)
/// 2. the first of `defaults` that exists
///
/// # Errors
///
/// Fails if an explicitly named file does not exist, or if no candidate does.
pub fn find_config_file(explicit: Option<&Path>, defaults: &[&str]) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        anyhow::bail!(
            "--config/{CONFIG_ENV} points to non-existent file: {}",
            path.display()
        );
    }

    if let Some(path) = defaults.iter().map(PathBuf::from).find(|p| p.exists()) {
        return Ok(path);
    }

    let paths_tried = defaults
        .iter()
        .map(|p| format!("  - {p}"))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - --config / {CONFIG_ENV} environment variable\n{paths_tried}"
    )
}

impl Courier {
    /// Read and parse a RON configuration file
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid configuration.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config from {}: {}", path.display(), e)
        })?;

        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config in {}: {e}", path.display()))
    }

    /// # Errors
    ///
    /// Fails if `content` is not a valid configuration.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let courier: Self = ron::from_str(content)?;
        courier.delivery.validate()?;
        for provider in &courier.providers {
            provider.validate()?;
        }
        Ok(courier)
    }

    pub const fn delivery(&self) -> &DispatchConfig {
        &self.delivery
    }

    pub fn providers(&self) -> &[SimulatedProviderConfig] {
        &self.providers
    }

    /// Build a dispatcher from this configuration
    ///
    /// # Errors
    ///
    /// Fails if the configuration has no providers.
    pub fn dispatcher(&self) -> anyhow::Result<Dispatcher> {
        let providers = self
            .providers
            .iter()
            .cloned()
            .map(|config| Arc::new(SimulatedProvider::new(config)) as Arc<dyn Provider>)
            .collect();

        Ok(Dispatcher::new(self.delivery, providers)?)
    }

    /// Run the dispatcher until a shutdown signal arrives, submitting `ids`
    /// on start.
    ///
    /// # Errors
    ///
    /// This function will return an error if the dispatcher cannot be built
    /// or the signal handlers cannot be installed.
    #[tracing::instrument(level = tracing::Level::TRACE, skip_all, err)]
    pub async fn run(self, ids: Vec<String>) -> anyhow::Result<()> {
        logging::init();

        let dispatcher = self.dispatcher()?;
        internal!(
            level = INFO,
            providers = self.providers.len(),
            "Controller running"
        );

        dispatcher.on_queued(|id| {
            tracing::debug!(message_id = %id, "Queued event");
        });

        for id in ids {
            dispatcher.submit(id);
        }

        let ret = tokio::select! {
            () = dispatcher.serve(SHUTDOWN_BROADCAST.subscribe()) => Ok(()),
            r = shutdown() => r,
        };

        dispatcher.shutdown();
        report(&dispatcher);

        internal!("Shutting down...");

        ret
    }
}

fn report(service: &dyn DispatchQueryService) {
    let (index, name) = service.current_provider();
    tracing::info!(
        queued = service.queue_len(),
        in_flight = service.in_flight(),
        provider_index = index,
        provider = %name,
        "Final dispatch state"
    );

    for record in service.list_records(None) {
        tracing::info!(
            message_id = %record.message_id,
            status = %record.status,
            retry_count = record.retry_count,
            last_updated = %record.last_updated.to_rfc3339(),
            "Delivery status"
        );
    }
}

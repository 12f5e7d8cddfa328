#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

use std::path::PathBuf;

use clap::Parser;
use courier::controller::{CONFIG_ENV, Courier, DEFAULT_CONFIG_PATHS, find_config_file};

/// Resilient outbound message dispatcher
#[derive(Parser, Debug)]
#[command(name = "courier", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "PATH", env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Message identifiers to submit on start
    #[arg(value_name = "IDS")]
    ids: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = find_config_file(cli.config.as_deref(), &DEFAULT_CONFIG_PATHS)?;
    let courier = Courier::load(&config_path)?;

    courier.run(cli.ids).await
}

//! tx-submit-api: relay signed Cardano transactions to a local node.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use tx_submit_api::{
    check_node, shutdown_signal, Config, NodeClientSessions, SubmitApiService, VERSION,
};

/// Transaction submit API for Cardano nodes
#[derive(Parser, Debug)]
#[command(name = "tx-submit-api")]
#[command(about = "HTTP API for submitting transactions to a Cardano node")]
#[command(version)]
struct Args {
    /// Path to a TOML config file. Environment variables override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("failed to load config")?;
    submit_telemetry::init_logging(&config.logging).context("failed to configure logging")?;
    submit_telemetry::register_metrics().context("failed to register metrics")?;

    info!(version = VERSION, "Starting tx-submit-api");

    let network_magic = config.node.network_magic()?;
    let timeout = config.node.timeout()?;
    let target = config.node.target();
    let sessions = Arc::new(NodeClientSessions::new(network_magic));

    if config.node.skip_check {
        info!(node = %target, "Skipping node check");
    } else {
        check_node(sessions.as_ref(), &target, timeout)
            .await
            .context("failed to connect to node")?;
    }

    let service = SubmitApiService::new(config, sessions)?;
    service.run(shutdown_signal()).await?;
    Ok(())
}

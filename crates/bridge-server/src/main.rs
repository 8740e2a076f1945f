//! biobridge: ECG/EDA metrics bridge
//!
//! Streams metrics from the simulated acquisition device. Hardware drivers
//! plug in through `bridge_core::DeviceConnector`.

use anyhow::{bail, Context};
use bridge_server::{spawn_signal_listener, BridgeServer, CliArgs};
use bridge_simulation::SimulatedConnector;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = args.bridge_config();
    config.validate().context("invalid bridge configuration")?;
    let simulation = args
        .simulation_config()
        .context("invalid simulation configuration")?;

    info!(
        port = config.port,
        scenario = %args.scenario,
        heart_rate = simulation.base_heart_rate,
        stress = simulation.stress_level,
        "Starting biobridge"
    );

    let cancel = CancellationToken::new();
    let signals = spawn_signal_listener(cancel.clone());

    let mut server =
        BridgeServer::with_cancellation(config, SimulatedConnector::new(simulation), cancel.clone())?;
    let summary = server.run().await?;

    cancel.cancel();
    if let Err(e) = signals.await {
        warn!(error = %e, "Signal listener task failed");
    }

    info!(
        session = %summary.session_id,
        packets = summary.packets_sent,
        samples = summary.samples_processed,
        cleanup_failures = summary.cleanup_failures.len(),
        "Session finished"
    );

    if summary.is_clean() {
        return Ok(());
    }
    match summary.error {
        Some(e) if e.is_fatal_startup() => {
            warn!("Bridge failed before a client was served");
            bail!(e)
        }
        Some(e) => bail!(e),
        None => Ok(()),
    }
}

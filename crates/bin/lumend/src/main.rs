use std::time::Duration;

use anyhow::Context;
use lumen_adapter_virtual::MotionSimulator;
use lumend::config::Config;
use lumend::runtime::Daemon;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging.filter);

    let daemon = Daemon::new(&config).context("failed to wire areas")?;

    let (reports_tx, reports_rx) = mpsc::channel(64);
    let simulator = config.runtime.simulate_motion.then(|| {
        MotionSimulator::start(
            daemon.motion_sensors(),
            Duration::from_secs(config.runtime.motion_interval_secs),
            Duration::from_secs(config.runtime.motion_on_secs),
            reports_tx.clone(),
        )
    });
    drop(reports_tx);

    daemon.start();
    tracing::info!(tick_ms = config.runtime.tick_ms, "lumend running");
    daemon.run(reports_rx, shutdown_signal()).await;

    if let Some(handle) = simulator {
        handle.abort();
    }
    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {filter:?} ({err}), falling back to info");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

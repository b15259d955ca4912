//! # Meridian Server
//!
//! Runs the worker pool against Redis until Ctrl+C or SIGTERM.

use meridian_config::ConfigLoader;
use meridian_core::{init_telemetry, MeridianResult};
use meridian_server::executor::DryRunExecutor;
use meridian_server::startup::{
    build_manager, install_metrics_exporter, print_startup_info, shutdown_signal,
};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Application error: {}", e);
        eprintln!("meridian-server: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run() -> MeridianResult<()> {
    let loader = ConfigLoader::from_default_location()?;
    let config = loader.get().await;

    init_telemetry(&config.observability)?;
    info!("Starting Meridian worker process...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    install_metrics_exporter(&config)?;
    print_startup_info(&config);

    let manager = build_manager(&config, Arc::new(DryRunExecutor)).await?;
    manager.start().await?;

    shutdown_signal().await;

    manager.stop().await?;
    info!("Shutdown complete");
    Ok(())
}

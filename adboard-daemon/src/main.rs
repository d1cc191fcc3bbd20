//! adboard Daemon
//!
//! Background service that manages the platform credential and serves the
//! performance read model to the dashboard shell.
//!
//! # Running
//!
//! ```bash
//! cargo run -p adboard-daemon
//! # or after install:
//! adboardd
//! ```

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod api;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("Starting adboard daemon...");

    let config = config::load_config()?;
    info!("Loaded configuration from {:?}", config.config_path);

    run_daemon(config).await
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run_daemon(config: config::DaemonConfig) -> Result<()> {
    info!("Daemon starting on {:?}", config.socket_path);

    let state = api::ApiState::new(&config).await?;

    let server_handle = api::start_server(&config.socket_path, state).await?;

    info!("Daemon running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping server...");

    server_handle.stop().await?;
    server_handle.stopped().await;

    // Clean up socket file
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
        info!("Socket file removed");
    }

    info!("Daemon stopped");
    Ok(())
}

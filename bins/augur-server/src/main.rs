//! Augur fee estimation server.
//!
//! Samples a Bitcoin node's mempool on a fixed schedule, persists snapshots
//! to date-partitioned JSON files, and serves fee-rate estimates over HTTP.

mod routes;

use std::path::PathBuf;

use anyhow::{Context, Result};
use augur_node::{AugurConfig, AugurService};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "augur-server",
    version,
    about = "Bitcoin mempool fee estimation server"
)]
struct Args {
    /// External configuration file (overrides AUGUR_CONFIG_FILE)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text")]
    log_format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, &args.log_format);

    let config = AugurConfig::load(args.config.as_deref());
    info!("Augur v{}", env!("CARGO_PKG_VERSION"));
    info!(
        bind = %config.server_addr(),
        rpc = %config.bitcoin_rpc.url,
        data_dir = %config.persistence.data_directory.display(),
        interval_ms = config.collector.interval_ms,
        "configuration loaded"
    );

    let service = AugurService::build(config.clone()).context("failed to build service")?;
    service.start();

    let app = routes::router(routes::AppState::new(service.queries()));
    let listener = tokio::net::TcpListener::bind(config.server_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.server_addr()))?;
    info!("listening on http://{}", config.server_addr());

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed");

    service.shutdown().await;
    info!("Augur shutdown complete");
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
    info!("received Ctrl+C, shutting down...");
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// `RUST_LOG`, when set, takes precedence over `level_str`. Pass
/// `format = "json"` for structured JSON output; anything else is text.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}

//! Storefront edge proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ dispatcher ──┬─▶ operational endpoints (local ack)
//!                     (request id,    (aliases,    │
//!                      limits)         bypass,     └─▶ origin ──▶ headless / primary
//!                                      routes)               │
//!     Client Response                                        ▼
//!     ◀────────────── response cache ◀── rewrite ◀── upstream response
//!
//!     Cross-cutting: config, TTL caches, logging, Prometheus metrics,
//!     performance aggregator, lifecycle (signals, graceful shutdown)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use storefront_edge::config::load_config;
use storefront_edge::lifecycle::wait_for_signal;
use storefront_edge::observability::{init_logging, init_metrics};
use storefront_edge::{EdgeConfig, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "storefront-edge")]
#[command(about = "Edge proxy splitting a storefront between headless and primary origins", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long, env = "EDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EdgeConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability)?;
    tracing::info!("storefront-edge v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        headless = %config.origins.headless.base_url,
        primary = %config.origins.primary.base_url,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;
    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.trigger();
    });

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

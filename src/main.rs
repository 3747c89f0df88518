//! RPC relay binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌───────────────────────────────────────────────┐
//!                       │                  RPC RELAY                    │
//!                       │                                               │
//!   Client Request      │  ┌────────┐     ┌─────────────────────────┐  │
//!   ────────────────────┼─▶│  http  │────▶│ dispatch                │  │
//!                       │  │ server │     │  Upgrade: websocket? ───┼──┼──┐
//!                       │  └────────┘     │  otherwise: forward ────┼──┼─▶│ upstream RPC
//!                       │                 └─────────────────────────┘  │  │ (+api-key)
//!                       │                                               │  │
//!                       │  ┌─────────────────────────────────────────┐ │  │
//!                       │  │ relay: session loop per WebSocket pair  │◀┼──┘
//!                       │  │  pumps ─ events ─ heartbeat ─ teardown  │ │
//!                       │  └─────────────────────────────────────────┘ │
//!                       │                                               │
//!                       │  cross-cutting: config, observability        │
//!                       └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use rpc_relay::config;
use rpc_relay::http::HttpServer;
use rpc_relay::observability;

/// Credential-injecting relay for a single upstream RPC service.
#[derive(Debug, Parser)]
#[command(name = "rpc-relay", version)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // The config decides the log level fallback but logging must exist before
    // config errors can be reported, so initialize with the default first.
    let config = match &args.config {
        Some(path) => config::load_config(path),
        None => config::load_default(),
    };

    let config = match config {
        Ok(config) => {
            observability::init_logging(&config.observability.log_level);
            config
        }
        Err(e) => {
            observability::init_logging("info");
            tracing::error!(error = %e, "failed to load configuration");
            return Err(e.into());
        }
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream_rpc = %config.upstream.rpc_url,
        upstream_ws = %config.upstream.ws_url,
        heartbeat_secs = config.heartbeat.interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

//! Egress Forwarder (v1)
//!
//! Outbound HTTP gateway built with Tokio, Axum and reqwest.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────────┐
//!                     │                     EGRESS FORWARDER                     │
//!                     │                                                          │
//!   POST /forwarder/  │  ┌─────────┐   ┌──────────────┐   ┌────────────────────┐ │
//!   exec              │  │  http   │──▶│   security   │──▶│     forwarder      │ │
//!   ──────────────────┼─▶│ server  │   │ client gate  │   │ validate → host    │ │
//!                     │  └─────────┘   └──────────────┘   │ gate → build →     │ │
//!                     │                                   │ transport →        │ │
//!   Envelope          │                                   │ classify           │ │
//!   ◀─────────────────┼───────────────────────────────────┴─────────┬──────────┘ │
//!                     │                                             │            │
//!                     │                                             ▼            │
//!                     │                                       Upstream API       │
//!                     │                                                          │
//!                     │  ┌────────────────────────────────────────────────────┐  │
//!                     │  │  config │ observability │ lifecycle (shutdown)      │  │
//!                     │  └────────────────────────────────────────────────────┘  │
//!                     └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use egress_forwarder::config::{load_config, loader::CONFIG_PATH_ENV};
use egress_forwarder::observability::{logging::init_logging, metrics::init_metrics};
use egress_forwarder::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "egress-forwarder")]
#[command(about = "Outbound HTTP forwarding gateway", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    init_logging(&config.observability);

    tracing::info!("egress-forwarder v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        default_timeout_ms = config.forwarder.default_timeout_ms,
        max_response_bytes = config.forwarder.max_response_bytes,
        max_redirects = config.forwarder.max_redirects,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    server
        .run(listener, Shutdown::signalled(shutdown.subscribe()))
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

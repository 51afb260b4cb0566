//! Game gateway (v1)
//!
//! An API gateway in front of the auth and session services, built with
//! Tokio and axum.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────▶ http server ──▶ routing (route table, policy)
//!                                     │
//!                                     ▼
//!                  discovery ◀── load_balancer (cursor, failover loop)
//!                 (registry cache)    │        ▲
//!                                     │        │ health (breaker-gated probe)
//!                                     ▼        │
//!     Client Response ◀── proxy (forwarder, outcome) ──▶ Backend instance
//!
//!     Cross-cutting: config, resilience (breaker, retries, timeouts),
//!                    lifecycle (signals, registration), observability
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use game_gateway::config::{load_config, GatewayConfig};
use game_gateway::discovery::registry_from_config;
use game_gateway::lifecycle::{spawn_signal_handler, Registrations, Shutdown};
use game_gateway::observability::{logging, metrics};
use game_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "game-gateway")]
#[command(about = "API gateway for the game auth and session services", long_about = None)]
struct Args {
    /// Path to a TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "game-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        registry = ?config.registry.kind,
        poll_interval_secs = config.registry.poll_interval_secs,
        forwarding_timeout_ms = config.forwarding.timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = registry_from_config(&config.registry)?;
    let registrations =
        Registrations::register_all(registry.clone(), &config.registry.register_on_startup).await;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_handler(shutdown.clone());

    let server = GatewayServer::new(config, registry);
    let served = server.run(listener, shutdown.subscribe()).await;

    registrations.deregister_all().await;
    served?;

    tracing::info!("Shutdown complete");
    Ok(())
}

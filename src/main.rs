//! fleetlink - vehicle telemetry bridge daemon
//!
//! Listens for a MAVLink telemetry stream on UDP and keeps a remote fleet
//! management API in sync with the vehicle's state.
//!
//! # Usage
//!
//! ```bash
//! # Run with defaults (listen 0.0.0.0:14550)
//! fleetlink
//!
//! # Point at a specific config file and override the API root
//! fleetlink --config /etc/fleetlink/fleetlink.toml --api-root https://fleet.example.com
//! ```
//!
//! # Environment Variables
//!
//! - `FLEETLINK_CONFIG`: path to the TOML config file
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use fleetlink::config::BridgeConfig;
use fleetlink::ingest::{FixedIdentity, IngestLoop};
use fleetlink::sync::SyncPolicy;
use fleetlink::telemetry::MavlinkUdpSource;
use fleetlink::{ApiClient, Fleet};

#[derive(Parser, Debug)]
#[command(name = "fleetlink")]
#[command(about = "MAVLink-to-fleet-API telemetry bridge")]
#[command(version)]
struct CliArgs {
    /// Path to the TOML config file (overrides FLEETLINK_CONFIG)
    #[arg(long)]
    config: Option<String>,

    /// Override the UDP listen endpoint (e.g. 0.0.0.0:14550)
    #[arg(long, value_name = "HOST:PORT")]
    listen: Option<String>,

    /// Override the fleet API root URL
    #[arg(long, value_name = "URL")]
    api_root: Option<String>,

    /// Override the vehicle uuid reported to the API
    #[arg(long)]
    uuid: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => BridgeConfig::load_from_file(std::path::Path::new(path))
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => BridgeConfig::load(),
    };
    if let Some(listen) = args.listen {
        config.telemetry.listen = listen;
    }
    if let Some(root) = args.api_root {
        config.api.root = root;
    }
    if let Some(uuid) = args.uuid {
        config.telemetry.vehicle_uuid = uuid;
    }

    info!("fleetlink {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        listen = %config.telemetry.listen,
        target_system = config.telemetry.target_system,
        uuid = %config.telemetry.vehicle_uuid,
        api = %config.api.root,
        polling_cycle_secs = config.sync.polling_cycle_secs,
        "Configuration loaded"
    );

    let client = ApiClient::new(&config.api).context("Failed to build API client")?;

    let mut source = MavlinkUdpSource::bind(&config.telemetry.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.telemetry.listen))?;

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT, shutting down");
            ctrl_c_cancel.cancel();
        }
    });

    let policy = SyncPolicy::new(
        Duration::from_secs(config.sync.polling_cycle_secs),
        config.api.set_by,
    );
    let resolver = FixedIdentity::new(
        config.telemetry.target_system,
        config.telemetry.vehicle_uuid.clone(),
    );

    let mut ingest = IngestLoop::new(policy, resolver, cancel);
    if let Some(secs) = config.fleet.idle_eviction_secs {
        ingest = ingest.with_idle_eviction(Duration::from_secs(secs));
    }

    let mut fleet = Fleet::new();
    let stats = ingest.run(&mut source, &client, &mut fleet).await;

    info!(
        messages = stats.messages,
        flushes = stats.flushes,
        flush_failures = stats.flush_failures,
        events = stats.events_posted,
        "fleetlink exiting"
    );

    Ok(())
}

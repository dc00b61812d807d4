//! Sensor gateway: entry point.
//!
//! Connects a radio sensor network (via a serial transceiver or a networked
//! radio bridge) to an MQTT broker.
//!
//! # Usage
//!
//! ```text
//! sensor-gateway [OPTIONS]
//!
//! Options:
//!   --config <PATH>         Settings file [default: platform config dir]
//!   --id                    Print the gateway's node identity and exit
//!   --broker-host <HOST>    Override [broker] host
//!   --broker-port <PORT>    Override [broker] port
//!   --transport <KIND>      Override [transport] kind (serial | tcp)
//!   --serial-port <PATH>    Override [transport] serial_port
//!   --tcp-addr <HOST:PORT>  Override [transport] tcp_addr
//! ```
//!
//! Every option can also come from an environment variable (`GATEWAY_*`).
//! Log verbosity follows `RUST_LOG`, falling back to `[gateway] log_level`.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sensor_gateway::application::dispatcher::CommandDispatcher;
use sensor_gateway::application::downlink::DownlinkTranslator;
use sensor_gateway::application::gateway::{run_transport_loop, GatewayContext};
use sensor_gateway::application::ports::ConfigStore;
use sensor_gateway::infrastructure::broker::mqtt;
use sensor_gateway::infrastructure::platform::hardware_seed;
use sensor_gateway::infrastructure::storage::sensor_store::SensorStore;
use sensor_gateway::infrastructure::storage::settings::{
    default_settings_path, load_settings, save_settings, GatewaySettings, TransportKind,
};
use sensor_gateway::infrastructure::transport::open_transport;
use sensor_gateway_core::TopicLayout;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Sensor network to MQTT gateway.
#[derive(Debug, Parser)]
#[command(
    name = "sensor-gateway",
    about = "Bridges a serial or radio sensor network to an MQTT broker",
    version
)]
struct Cli {
    /// Settings file.  Created with defaults if it does not exist.
    #[arg(long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Print the gateway's node identity and exit.
    #[arg(long)]
    id: bool,

    #[arg(long, env = "GATEWAY_BROKER_HOST")]
    broker_host: Option<String>,

    #[arg(long, env = "GATEWAY_BROKER_PORT")]
    broker_port: Option<u16>,

    #[arg(long, value_enum, env = "GATEWAY_TRANSPORT")]
    transport: Option<TransportKind>,

    #[arg(long, env = "GATEWAY_SERIAL_PORT")]
    serial_port: Option<String>,

    #[arg(long, env = "GATEWAY_TCP_ADDR")]
    tcp_addr: Option<String>,
}

impl Cli {
    /// Applies command-line overrides on top of the file settings.
    fn apply_overrides(&self, settings: &mut GatewaySettings) {
        if let Some(host) = &self.broker_host {
            settings.broker.host = host.clone();
        }
        if let Some(port) = self.broker_port {
            settings.broker.port = port;
        }
        if let Some(kind) = self.transport {
            settings.transport.kind = kind;
        }
        if let Some(path) = &self.serial_port {
            settings.transport.serial_port = path.clone();
        }
        if let Some(addr) = &self.tcp_addr {
            settings.transport.tcp_addr = addr.clone();
        }
    }

    fn settings_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => default_settings_path().context("no --config given"),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings_path = cli.settings_path()?;
    let mut settings = load_settings(&settings_path)
        .with_context(|| format!("failed to load settings from {}", settings_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.gateway.log_level)),
        )
        .init();

    if !settings_path.exists() {
        save_settings(&settings_path, &settings).with_context(|| {
            format!("failed to write default settings to {}", settings_path.display())
        })?;
        info!("wrote default settings to {}", settings_path.display());
    }
    cli.apply_overrides(&mut settings);

    // ── Node identity ─────────────────────────────────────────────────────────
    let store_path = settings.storage.resolve(settings_path.parent());
    let store = Arc::new(
        SensorStore::open(&store_path)
            .with_context(|| format!("failed to open sensor store {}", store_path.display()))?,
    );
    let node_id = store
        .node_identity(&hardware_seed())
        .context("failed to establish node identity")?;

    if cli.id {
        println!("{node_id}");
        return Ok(());
    }

    info!(
        "sensor gateway starting: node={node_id}, broker={}:{}, transport={:?}",
        settings.broker.host, settings.broker.port, settings.transport.kind
    );
    info!("{} provisioned sensors", store.sensors()?.len());

    // ── Wiring ────────────────────────────────────────────────────────────────
    let transport = open_transport(&settings.transport).context("failed to open transport")?;
    let (broker, eventloop) = mqtt::connect(&settings.broker);
    let topics = TopicLayout::new(settings.broker.topic_base.clone(), node_id);
    let command_filter = topics.command_filter();

    let ctx = Arc::new(
        GatewayContext::new(store, transport, Arc::new(broker.clone()), topics)
            .with_resync_delay(settings.gateway.resync_delay()),
    );

    // ── Graceful shutdown ─────────────────────────────────────────────────────
    // The transport loop polls `running`; the broker loop waits on `shutdown`.
    let running = Arc::new(AtomicBool::new(true));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    {
        let running = Arc::clone(&running);
        let shutdown_tx = Arc::clone(&shutdown_tx);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("received Ctrl+C, shutting down");
                    running.store(false, Ordering::Relaxed);
                    shutdown_tx.send_replace(true);
                }
                Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
            }
        });
    }

    let broker_task = tokio::spawn(mqtt::run_broker_loop(
        eventloop,
        broker,
        command_filter,
        DownlinkTranslator::new(Arc::clone(&ctx)),
        shutdown_rx,
    ));

    run_transport_loop(
        CommandDispatcher::new(ctx),
        settings.transport.poll_interval(),
        Arc::clone(&running),
    )
    .await;

    shutdown_tx.send_replace(true);
    if let Err(e) = broker_task.await {
        error!("broker loop panicked: {e}");
    }

    info!("sensor gateway stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_leave_settings_untouched() {
        // Arrange
        let cli = Cli::parse_from(["sensor-gateway"]);
        let mut settings = GatewaySettings::default();

        // Act
        cli.apply_overrides(&mut settings);

        // Assert
        assert_eq!(settings, GatewaySettings::default());
        assert!(!cli.id);
    }

    #[test]
    fn test_cli_id_flag() {
        let cli = Cli::parse_from(["sensor-gateway", "--id"]);
        assert!(cli.id);
    }

    #[test]
    fn test_cli_broker_overrides() {
        let cli = Cli::parse_from([
            "sensor-gateway",
            "--broker-host",
            "broker.local",
            "--broker-port",
            "8883",
        ]);
        let mut settings = GatewaySettings::default();
        cli.apply_overrides(&mut settings);
        assert_eq!(settings.broker.host, "broker.local");
        assert_eq!(settings.broker.port, 8883);
    }

    #[test]
    fn test_cli_transport_overrides() {
        let cli = Cli::parse_from([
            "sensor-gateway",
            "--transport",
            "tcp",
            "--tcp-addr",
            "10.1.1.1:5000",
            "--serial-port",
            "/dev/ttyAMA0",
        ]);
        let mut settings = GatewaySettings::default();
        cli.apply_overrides(&mut settings);
        assert_eq!(settings.transport.kind, TransportKind::Tcp);
        assert_eq!(settings.transport.tcp_addr, "10.1.1.1:5000");
        assert_eq!(settings.transport.serial_port, "/dev/ttyAMA0");
    }

    #[test]
    fn test_cli_rejects_unknown_transport() {
        assert!(Cli::try_parse_from(["sensor-gateway", "--transport", "usb"]).is_err());
    }

    #[test]
    fn test_cli_explicit_config_path_is_used() {
        let cli = Cli::parse_from(["sensor-gateway", "--config", "/tmp/gw.toml"]);
        assert_eq!(cli.settings_path().unwrap(), PathBuf::from("/tmp/gw.toml"));
    }
}

//! Fujitsu Climate Daemon
//!
//! Drives a Fujitsu heat pump over the wired-remote serial bus, acting as
//! one of the two wall controllers the unit accepts.
//!
//! Published state and faults go to the log, and with `--json` also to stdout
//! as one JSON object per line. Control requests are read from stdin as JSON
//! lines (see `commands`).
//!
//! The serial device comes from `--device`, the `[serial]` section of the
//! config file, or the first USB serial adapter found, in that order.

mod commands;
mod config;
mod connection;
mod publisher;
mod shutdown;

use anyhow::Result;
use clap::Parser;
use config::RuntimeConfig;
use connection::Connector;
use fujitsu_core::ControllerRole;
use fujitsu_hardware::{
    available_ports, is_disconnect_error, run_session, ChannelTransport, FujitsuClimate,
};
use publisher::LogPublisher;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Control requests buffered between stdin and the session loop
const COMMAND_QUEUE_LEN: usize = 16;

/// Fujitsu heat pump controller daemon
#[derive(Parser, Debug)]
#[command(name = "fujitsud")]
#[command(version, about = "Fujitsu heat pump controller daemon", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device path (e.g., /dev/ttyUSB0)
    ///
    /// Takes precedence over the device in the config file.
    #[arg(short, long)]
    device: Option<String>,

    /// Wall-controller slot to occupy on the bus (primary, secondary)
    #[arg(long)]
    role: Option<ControllerRole>,

    /// Enable verbose logging, including every frame on the bus
    #[arg(short, long)]
    verbose: bool,

    /// Print published state and faults as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.verbose);

    if args.list_ports {
        return list_ports();
    }

    info!("Fujitsu climate daemon starting...");

    // Determine config path: CLI flag > env var > default
    let config_path = config::resolve_config_path(args.config);
    let mut runtime_config = RuntimeConfig::load(&config_path).await?;
    runtime_config.apply_overrides(args.device, args.role, args.verbose);
    info!(
        "Configuration loaded from {}",
        runtime_config.path().display()
    );

    let config = runtime_config.static_config().clone();
    let name = config.controller.name.clone();

    let publisher = if args.json {
        LogPublisher::with_json_stdout(&name)
    } else {
        LogPublisher::new(&name)
    };
    let (transport, mut outbound) = ChannelTransport::channel();
    let mut climate = FujitsuClimate::new(&config, transport, publisher);

    let (command_tx, mut commands) = mpsc::channel(COMMAND_QUEUE_LEN);
    let _stdin_reader = commands::spawn_stdin_reader(command_tx);

    let connector = Connector::new(
        config.serial.device.clone(),
        config.reconnect.clone(),
        config.timing.response_timeout(),
    );

    let shutdown = shutdown::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let mut port = tokio::select! {
            _ = &mut shutdown => break,
            port = connector.connect() => port?,
        };

        // Frames queued while disconnected are stale
        let mut dropped = 0usize;
        while outbound.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!("Dropped {} frames queued while disconnected", dropped);
        }

        info!("Controller '{}' ready", name);

        let result = run_session(
            &mut port,
            &mut climate,
            &mut outbound,
            &mut commands,
            &config.timing,
            &mut shutdown,
        )
        .await;

        match result {
            Ok(()) => break,
            Err(e) if is_disconnect_error(&e) && connector.reconnection_enabled() => {
                warn!("Serial adapter lost: {}. Reconnecting...", e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    let stats = climate.link_stats();
    info!(
        "Link totals: {} frames received, {} frames sent, {} bytes discarded",
        stats.frames_received, stats.frames_sent, stats.bytes_discarded
    );
    info!("Shutdown complete");
    Ok(())
}

/// Print the serial ports found on this host
fn list_ports() -> Result<()> {
    let ports = available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    for port in ports {
        println!("{}\t{}", port.name, port.description);
    }
    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Keep stdout free for JSON lines
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

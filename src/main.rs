//! # LoRa Sensor Node
//!
//! Sample an onboard sensor suite and uplink Cayenne LPP telemetry over
//! LoRaWAN through a serial modem.
//!
//! ```text
//! lora-sensor-node [config-path]
//! ```

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use lora_sensor_node::config::{Config, LoggingConfig};
use lora_sensor_node::link::modem::SerialModemLink;
use lora_sensor_node::node::{self, Collaborators, NodeExit, NodeSettings};
use lora_sensor_node::operator::SignalCancel;
use lora_sensor_node::restart;
use lora_sensor_node::sensors::SimulatedSensors;
use lora_sensor_node::serial::ModemSerial;
use lora_sensor_node::status::LogNotifier;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for the sensor node
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load and validate the configuration
///    - Set up logging (console, plus a daily file when configured)
///    - Open the modem serial port and install the SIGUSR1 cancel handler
///
/// 2. **Run**
///    - Join the network, then send a frame every period
///    - Ctrl+C shuts down at any point
///
/// 3. **Exit**
///    - Operator cancel: stay idle until Ctrl+C
///    - Transmit failure or join timeout: fatal restart
///
/// # Errors
///
/// Returns error if:
/// - The configuration cannot be loaded or is invalid
/// - No modem device can be opened
/// - The modem rejects a configuration command
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let log_guard = init_logging(&config.logging)?;

    info!("LoRa Sensor Node v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_path);

    let exit = run(&config).await?;

    match exit {
        Some(NodeExit::Restart(e)) => {
            // process::exit skips destructors; flush the file writer first
            drop(log_guard);
            restart::fatal(config.restart.policy, &e)
        }
        Some(NodeExit::Cancelled) => {
            info!("Sending cancelled; idle until restart (Ctrl+C to exit)");
            tokio::signal::ctrl_c().await?;
            info!("Received Ctrl+C, shutting down...");
        }
        None => info!("Received Ctrl+C, shutting down..."),
    }

    Ok(())
}

/// Bring up the node; `None` means Ctrl+C arrived first
async fn run(config: &Config) -> Result<Option<NodeExit>> {
    let settings = NodeSettings::from_config(config)?;

    let modem = ModemSerial::open(&config.link.port, config.link.baud_rate)?;
    info!("LoRaWAN modem opened at: {}", modem.device_path);
    let link = SerialModemLink::new(modem.port, config.modem_settings());

    let operator = SignalCancel::new();
    if let Err(e) = operator.listen() {
        warn!("Operator cancel unavailable: {}", e);
    }

    let parts = Collaborators {
        link,
        sensors: Box::new(SimulatedSensors::new(
            config.sensors.baro_mode,
            config.sensors.simulated_altitude_m,
        )),
        notifier: Arc::new(LogNotifier::new(config.status.render_patterns)),
        operator: Box::new(operator),
    };

    info!("Press Ctrl+C to exit, send SIGUSR1 to cancel sending");

    tokio::select! {
        exit = node::run(settings, parts) => Ok(Some(exit?)),
        _ = tokio::signal::ctrl_c() => Ok(None),
    }
}

/// Console logging, plus a daily rolling file when `dir` is set
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let console = tracing_subscriber::fmt::layer();

    match &logging.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir))?;
            let appender = tracing_appender::rolling::daily(dir, &logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);

            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(file)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry().with(filter).with(console).init();
            Ok(None)
        }
    }
}

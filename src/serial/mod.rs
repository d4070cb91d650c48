//! # Serial Communication Module
//!
//! Handles the serial connection to the LoRaWAN modem.
//!
//! This module handles:
//! - Opening the modem port (57,600 baud, 8N1)
//! - Auto-detecting the device among common paths
//! - Line-oriented async I/O through [`port_trait::SerialPortIO`]

pub mod port_trait;

use crate::error::{NodeError, Result};
use port_trait::{StreamPort, TokioSerialPort};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Default modem baud rate (RN2903 family)
pub const MODEM_BAUD_RATE: u32 = 57_600;

/// Default modem device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC modems
    "/dev/ttyUSB0", // USB-to-serial adapters
    "/dev/serial0", // Raspberry Pi UART header
];

/// An opened modem port and the path it was found at
pub struct ModemSerial {
    pub port: TokioSerialPort,
    pub device_path: String,
}

impl std::fmt::Debug for ModemSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModemSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl ModemSerial {
    /// Open the modem at `path`, or auto-detect it when `path` is empty
    ///
    /// # Errors
    ///
    /// Returns error if no modem device could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use lora_sensor_node::serial::{ModemSerial, MODEM_BAUD_RATE};
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let modem = ModemSerial::open("", MODEM_BAUD_RATE)?;
    ///     println!("Modem at {}", modem.device_path);
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        if path.is_empty() {
            Self::open_with_paths(DEFAULT_DEVICE_PATHS, baud_rate)
        } else {
            Self::open_with_paths(&[path], baud_rate)
        }
    }

    /// Open the first device that succeeds among `paths`
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(stream) => {
                    info!("Successfully opened LoRaWAN modem at {}", path);
                    return Ok(Self {
                        port: StreamPort::new(stream),
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(NodeError::SerialPortNotFound(paths.join(", ")))
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| NodeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }
}

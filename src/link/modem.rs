//! # Serial LoRaWAN Modem Link
//!
//! [`Link`] implementation for modems driven by the RN2903-style ASCII
//! command set. Every command is a CRLF-terminated line answered by one
//! reply line; `mac join` and `mac tx` send a second, asynchronous reply
//! when the radio operation finishes.
//!
//! ```text
//! > mac join otaa          > mac tx uncnf 1 0102...
//! < ok                     < ok
//! < accepted | denied      < mac_tx_ok | mac_rx <port> <data> | mac_err
//! ```

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::region::REGION_CHANNEL_COUNT;
use super::{ChannelMask, DataRate, Link, OtaaCredentials};
use crate::error::{NodeError, Result};
use crate::hex::{parse_hex, to_hex};
use crate::serial::port_trait::SerialPortIO;

/// Modem timing and addressing settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModemSettings {
    /// Time allowed for the immediate reply to a command
    pub response_timeout: Duration,
    /// Time allowed for the transmission result after `mac tx`
    pub tx_timeout: Duration,
    /// How long one join poll waits for the join result
    pub poll_timeout: Duration,
    /// LoRaWAN application port for uplinks
    pub fport: u8,
}

impl Default for ModemSettings {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(2),
            tx_timeout: Duration::from_secs(10),
            poll_timeout: Duration::from_millis(100),
            fport: 1,
        }
    }
}

/// LoRaWAN modem on a serial port
pub struct SerialModemLink<P> {
    port: P,
    settings: ModemSettings,
}

impl<P: SerialPortIO> SerialModemLink<P> {
    pub fn new(port: P, settings: ModemSettings) -> Self {
        Self { port, settings }
    }

    /// Send one command and return its immediate reply
    async fn command(&mut self, command: &str) -> io::Result<String> {
        debug!("> {}", command);
        self.port.write_all(format!("{}\r\n", command).as_bytes()).await?;
        self.port.flush().await?;

        match self.port.read_line(self.settings.response_timeout).await? {
            Some(reply) => {
                debug!("< {}", reply);
                Ok(reply)
            }
            None => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no reply to '{}'", command),
            )),
        }
    }

    /// Send a command that must be answered with `ok`
    async fn expect_ok(&mut self, command: &str) -> Result<()> {
        let reply = self
            .command(command)
            .await
            .map_err(|e| NodeError::Link(format!("'{}' failed: {}", command, e)))?;

        if reply != "ok" {
            return Err(NodeError::Link(format!(
                "'{}' rejected by modem: {}",
                command, reply
            )));
        }
        Ok(())
    }

    async fn hardware_eui(&mut self) -> Result<[u8; 8]> {
        let reply = self
            .command("sys get hweui")
            .await
            .map_err(|e| NodeError::Link(format!("reading hardware EUI failed: {}", e)))?;
        parse_hex("hweui", &reply)
            .map_err(|_| NodeError::Link(format!("invalid hardware EUI reply: {}", reply)))
    }
}

#[async_trait]
impl<P: SerialPortIO> Link for SerialModemLink<P> {
    async fn configure_region(&mut self, mask: &ChannelMask) -> Result<()> {
        for channel in 0..REGION_CHANNEL_COUNT {
            let status = if mask.is_enabled(channel) { "on" } else { "off" };
            self.expect_ok(&format!("mac set ch status {} {}", channel, status))
                .await?;
        }
        Ok(())
    }

    async fn begin_join(&mut self, credentials: &OtaaCredentials) -> Result<()> {
        let dev_eui = match credentials.dev_eui {
            Some(eui) => eui,
            None => self.hardware_eui().await?,
        };
        info!("Joining as DevEUI {}", to_hex(&dev_eui));

        self.expect_ok(&format!("mac set deveui {}", to_hex(&dev_eui))).await?;
        self.expect_ok(&format!("mac set appeui {}", to_hex(&credentials.app_eui)))
            .await?;
        self.expect_ok(&format!("mac set appkey {}", to_hex(&credentials.app_key)))
            .await?;
        self.expect_ok("mac join otaa").await
    }

    async fn poll_joined(&mut self) -> Result<bool> {
        let line = self
            .port
            .read_line(self.settings.poll_timeout)
            .await
            .map_err(|e| NodeError::Link(format!("reading join result failed: {}", e)))?;

        match line.as_deref() {
            None => Ok(false),
            Some("accepted") => Ok(true),
            Some("denied") => {
                warn!("Join denied, retrying");
                self.expect_ok("mac join otaa").await?;
                Ok(false)
            }
            Some(other) => {
                debug!("Ignoring modem output while joining: {}", other);
                Ok(false)
            }
        }
    }

    async fn set_data_rate(&mut self, rate: DataRate) -> Result<()> {
        self.expect_ok(&format!("mac set dr {}", rate.index())).await
    }

    async fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        let command = format!("mac tx uncnf {} {}", self.settings.fport, to_hex(payload));
        let reply = self.command(&command).await?;
        if reply != "ok" {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("uplink rejected by modem: {}", reply),
            ));
        }

        let result = self
            .port
            .read_line(self.settings.tx_timeout)
            .await?
            .ok_or_else(|| io::Error::new(io::ErrorKind::TimedOut, "no transmission result"))?;
        debug!("< {}", result);

        if result == "mac_tx_ok" {
            Ok(())
        } else if result.starts_with("mac_rx") {
            // Downlinks are not processed; the uplink itself succeeded
            debug!("Discarding downlink: {}", result);
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("transmission failed: {}", result),
            ))
        }
    }
}

//! # Error Types
//!
//! Custom error types for the sensor node using `thiserror`.

use std::time::Duration;
use thiserror::Error;

/// Main error type for the sensor node
#[derive(Debug, Error)]
pub enum NodeError {
    /// Invalid configuration detected at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing errors
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Cayenne LPP encoding/decoding errors
    #[error("Payload error: {0}")]
    Payload(String),

    /// Link (radio modem) protocol errors
    #[error("Link error: {0}")]
    Link(String),

    /// Join handshake did not complete in time
    #[error("Join not completed after {0:?}")]
    JoinTimeout(Duration),

    /// Uplink transmission failed
    #[error("Transmit error: {0}")]
    Transmit(#[source] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// No modem device could be opened
    #[error("Serial port not found (tried: {0})")]
    SerialPortNotFound(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    /// Whether this error must be handled by restarting the whole process
    pub fn is_fatal_restart(&self) -> bool {
        matches!(self, NodeError::Transmit(_) | NodeError::JoinTimeout(_))
    }
}

/// Result type alias for the sensor node
pub type Result<T> = std::result::Result<T, NodeError>;

//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{NodeError, Result};
use crate::link::modem::ModemSettings;
use crate::link::{ChannelMask, DataRate, JoinSettings, OtaaCredentials, Region};
use crate::restart::RestartPolicy;
use crate::sensors::BaroMode;
use crate::telemetry::frame::PayloadEncoder;
use crate::telemetry::measurement::MeasurementKind;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,
    pub lorawan: LorawanConfig,
    #[serde(default)]
    pub join: JoinConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub payload: PayloadConfig,
    #[serde(default)]
    pub sensors: SensorConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub restart: RestartConfig,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial modem configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    /// Empty string auto-detects the modem
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,

    #[serde(default = "default_tx_timeout_ms")]
    pub tx_timeout_ms: u64,

    #[serde(default = "default_fport")]
    pub fport: u8,
}

/// LoRaWAN network configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LorawanConfig {
    #[serde(default = "default_region")]
    pub region: Region,

    #[serde(default = "default_sub_band")]
    pub sub_band: u8,

    #[serde(default = "default_data_rate")]
    pub data_rate: u8,

    pub app_eui: String,

    pub app_key: String,

    #[serde(default)]
    pub dev_eui: Option<String>,
}

/// Join handshake configuration
#[derive(Debug, Deserialize, Clone)]
pub struct JoinConfig {
    #[serde(default = "default_join_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Absent means wait for the join forever
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Cycle scheduling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

/// Payload layout configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PayloadConfig {
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    #[serde(default = "default_fields")]
    pub fields: Vec<MeasurementKind>,
}

/// Sensor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SensorConfig {
    #[serde(default = "default_baro_mode")]
    pub baro_mode: BaroMode,

    /// Resting altitude reported by the simulated sensor suite
    #[serde(default)]
    pub simulated_altitude_m: f32,
}

/// Status indication configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StatusConfig {
    #[serde(default = "default_render_patterns")]
    pub render_patterns: bool,
}

/// Fatal restart configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RestartConfig {
    #[serde(default = "default_restart_policy")]
    pub policy: RestartPolicy,
}

/// Frame journal configuration
#[derive(Debug, Deserialize, Clone)]
pub struct JournalConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_journal_path")]
    pub path: String,
}

/// File logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Directory for daily log files; console only when absent
    #[serde(default)]
    pub dir: Option<String>,

    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

// Default value functions
fn default_baud_rate() -> u32 { 57_600 }
fn default_response_timeout_ms() -> u64 { 2000 }
fn default_tx_timeout_ms() -> u64 { 10_000 }
fn default_fport() -> u8 { 1 }

fn default_region() -> Region { Region::Us915 }
fn default_sub_band() -> u8 { 2 }
fn default_data_rate() -> u8 { 1 }

fn default_join_poll_interval_ms() -> u64 { 2500 }

fn default_period_ms() -> u64 { 30_000 }
fn default_initial_delay_ms() -> u64 { 0 }

fn default_max_size() -> usize { 60 }
fn default_fields() -> Vec<MeasurementKind> { MeasurementKind::DEFAULT_LAYOUT.to_vec() }

fn default_baro_mode() -> BaroMode { BaroMode::Altitude }

fn default_render_patterns() -> bool { true }

fn default_restart_policy() -> RestartPolicy { RestartPolicy::Exit }

fn default_journal_path() -> String { "./journal/frames.jsonl".to_string() }

fn default_log_file_prefix() -> String { "lora-sensor-node.log".to_string() }

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            response_timeout_ms: default_response_timeout_ms(),
            tx_timeout_ms: default_tx_timeout_ms(),
            fport: default_fport(),
        }
    }
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_join_poll_interval_ms(),
            timeout_ms: None,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            fields: default_fields(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            baro_mode: default_baro_mode(),
            simulated_altitude_m: 0.0,
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self { render_patterns: default_render_patterns() }
    }
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self { policy: default_restart_policy() }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_journal_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            file_prefix: default_log_file_prefix(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use lora_sensor_node::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Channel mask for the configured sub-band
    pub fn channel_mask(&self) -> Result<ChannelMask> {
        ChannelMask::for_sub_band(self.lorawan.sub_band)
    }

    pub fn data_rate(&self) -> Result<DataRate> {
        DataRate::new(self.lorawan.region, self.lorawan.data_rate)
    }

    pub fn credentials(&self) -> Result<OtaaCredentials> {
        OtaaCredentials::from_hex(
            &self.lorawan.app_eui,
            &self.lorawan.app_key,
            self.lorawan.dev_eui.as_deref(),
        )
    }

    pub fn payload_encoder(&self) -> Result<PayloadEncoder> {
        PayloadEncoder::new(&self.payload.fields, self.payload.max_size)
    }

    pub fn join_settings(&self) -> JoinSettings {
        JoinSettings {
            poll_interval: Duration::from_millis(self.join.poll_interval_ms),
            timeout: self.join.timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn modem_settings(&self) -> ModemSettings {
        ModemSettings {
            response_timeout: Duration::from_millis(self.link.response_timeout_ms),
            tx_timeout: Duration::from_millis(self.link.tx_timeout_ms),
            fport: self.link.fport,
            ..ModemSettings::default()
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.schedule.period_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.schedule.initial_delay_ms)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Validate link configuration
        if ![9600, 19_200, 57_600, 115_200].contains(&self.link.baud_rate) {
            return Err(config_error("baud_rate must be one of: 9600, 19200, 57600, 115200"));
        }

        if self.link.response_timeout_ms == 0 || self.link.response_timeout_ms > 60_000 {
            return Err(config_error("response_timeout_ms must be between 1 and 60000"));
        }

        if self.link.tx_timeout_ms == 0 || self.link.tx_timeout_ms > 120_000 {
            return Err(config_error("tx_timeout_ms must be between 1 and 120000"));
        }

        // Application ports 1-223; 0 is MAC-only, 224+ reserved
        if self.link.fport == 0 || self.link.fport > 223 {
            return Err(config_error("fport must be between 1 and 223"));
        }

        // Validate LoRaWAN parameters
        self.channel_mask()?;
        let data_rate = self.data_rate()?;
        self.credentials()?;

        // Validate timing fields
        if self.join.poll_interval_ms == 0 || self.join.poll_interval_ms > 60_000 {
            return Err(config_error("join poll_interval_ms must be between 1 and 60000"));
        }

        if self.join.timeout_ms == Some(0) {
            return Err(config_error("join timeout_ms must be greater than 0 (omit it to wait forever)"));
        }

        if self.schedule.period_ms < 1000 || self.schedule.period_ms > 86_400_000 {
            return Err(config_error("period_ms must be between 1000 and 86400000"));
        }

        if self.schedule.initial_delay_ms > self.schedule.period_ms {
            return Err(config_error("initial_delay_ms must not exceed period_ms"));
        }

        // Validate payload layout
        if self.payload.max_size == 0 || self.payload.max_size > 242 {
            return Err(config_error("max_size must be between 1 and 242"));
        }

        let encoder = self.payload_encoder()?;
        if encoder.frame_size() > data_rate.max_payload() {
            return Err(NodeError::Config(format!(
                "payload layout needs up to {} bytes but DR{} carries at most {}",
                encoder.frame_size(),
                data_rate.index(),
                data_rate.max_payload()
            )));
        }

        if self.sensors.baro_mode == BaroMode::Pressure
            && self.payload.fields.contains(&MeasurementKind::Altitude)
        {
            return Err(config_error("altitude field requires baro_mode = \"altitude\""));
        }

        // Validate journal and logging
        if self.journal.enabled && self.journal.path.is_empty() {
            return Err(config_error("journal path cannot be empty when enabled"));
        }

        if self.logging.file_prefix.is_empty() {
            return Err(config_error("logging file_prefix cannot be empty"));
        }

        Ok(())
    }
}

fn config_error(msg: &str) -> NodeError {
    NodeError::Config(msg.to_string())
}

//! # Sensor Suite
//!
//! Read interface for the onboard sensors.
//!
//! This module handles:
//! - The collaborator trait the send pipeline samples each cycle
//! - Reading types in physical units
//! - A deterministic simulated suite for running without hardware

mod simulated;

pub use simulated::SimulatedSensors;

use serde::Deserialize;

/// Barometer operating mode, chosen once at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaroMode {
    Altitude,
    Pressure,
}

/// Motion sensor reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionReading {
    /// Degrees
    pub pitch: f32,
    /// Degrees
    pub roll: f32,
    /// g per axis (x, y, z)
    pub acceleration: [f32; 3],
}

/// Barometric sensor reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaroReading {
    /// Meters in altitude mode, pascals in pressure mode
    pub value: f32,
    /// Degrees Celsius
    pub temperature: f32,
}

/// Ambient light reading for both photodiode channels, in lux
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightReading {
    pub channel0: f32,
    pub channel1: f32,
}

impl LightReading {
    /// Average of both channels
    pub fn average(&self) -> f32 {
        (self.channel0 + self.channel1) / 2.0
    }
}

/// Sensor suite collaborator
///
/// Reads are synchronous and fast relative to the cycle period.
#[cfg_attr(test, mockall::automock)]
pub trait SensorSuite: Send {
    /// Called once at the start of every cycle, before any read
    fn begin_cycle(&mut self);

    fn read_motion(&mut self) -> MotionReading;

    fn read_barometer(&mut self) -> BaroReading;

    fn read_light(&mut self) -> LightReading;

    /// Percent relative humidity
    fn read_humidity(&mut self) -> f32;

    /// Volts
    fn read_battery_voltage(&mut self) -> f32;
}

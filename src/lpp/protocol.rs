//! # Cayenne LPP Constants and Types
//!
//! Core definitions for the Cayenne Low Power Payload format.
//!
//! Every record is laid out as:
//!
//! ```text
//! [channel:u8][type:u8][data: type-specific, big-endian]
//! ```

/// Size of the per-record header (channel + type)
pub const LPP_RECORD_HEADER_SIZE: usize = 2;

/// Default maximum payload size in bytes
pub const LPP_DEFAULT_MAX_SIZE: usize = 60;

/// Analog input type id (0.01 signed)
pub const LPP_ANALOG_INPUT: u8 = 2;

/// Illuminance type id (1 lux unsigned)
pub const LPP_ILLUMINANCE: u8 = 101;

/// Temperature type id (0.1 °C signed)
pub const LPP_TEMPERATURE: u8 = 103;

/// Relative humidity type id (0.5 % unsigned)
pub const LPP_RELATIVE_HUMIDITY: u8 = 104;

/// Accelerometer type id (0.001 g signed, per axis)
pub const LPP_ACCELEROMETER: u8 = 113;

/// Data sizes in bytes (excluding the record header)
pub const LPP_ANALOG_INPUT_SIZE: usize = 2;
pub const LPP_ILLUMINANCE_SIZE: usize = 2;
pub const LPP_TEMPERATURE_SIZE: usize = 2;
pub const LPP_RELATIVE_HUMIDITY_SIZE: usize = 1;
pub const LPP_ACCELEROMETER_SIZE: usize = 6;

/// Multipliers applied before rounding to the wire integer
pub const LPP_ANALOG_INPUT_MULTIPLIER: f32 = 100.0;
pub const LPP_ILLUMINANCE_MULTIPLIER: f32 = 1.0;
pub const LPP_TEMPERATURE_MULTIPLIER: f32 = 10.0;
pub const LPP_RELATIVE_HUMIDITY_MULTIPLIER: f32 = 2.0;
pub const LPP_ACCELEROMETER_MULTIPLIER: f32 = 1000.0;

/// Cayenne LPP data types supported by the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LppType {
    AnalogInput,
    Illuminance,
    Temperature,
    RelativeHumidity,
    Accelerometer,
}

impl LppType {
    /// Wire type id
    pub fn id(self) -> u8 {
        match self {
            LppType::AnalogInput => LPP_ANALOG_INPUT,
            LppType::Illuminance => LPP_ILLUMINANCE,
            LppType::Temperature => LPP_TEMPERATURE,
            LppType::RelativeHumidity => LPP_RELATIVE_HUMIDITY,
            LppType::Accelerometer => LPP_ACCELEROMETER,
        }
    }

    /// Size of the data part of a record of this type
    pub fn data_size(self) -> usize {
        match self {
            LppType::AnalogInput => LPP_ANALOG_INPUT_SIZE,
            LppType::Illuminance => LPP_ILLUMINANCE_SIZE,
            LppType::Temperature => LPP_TEMPERATURE_SIZE,
            LppType::RelativeHumidity => LPP_RELATIVE_HUMIDITY_SIZE,
            LppType::Accelerometer => LPP_ACCELEROMETER_SIZE,
        }
    }

    /// Size of a complete record (header + data)
    pub fn record_size(self) -> usize {
        LPP_RECORD_HEADER_SIZE + self.data_size()
    }

    /// Look up a type by its wire id
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            LPP_ANALOG_INPUT => Some(LppType::AnalogInput),
            LPP_ILLUMINANCE => Some(LppType::Illuminance),
            LPP_TEMPERATURE => Some(LppType::Temperature),
            LPP_RELATIVE_HUMIDITY => Some(LppType::RelativeHumidity),
            LPP_ACCELEROMETER => Some(LppType::Accelerometer),
            _ => None,
        }
    }
}

/// A decoded record value in physical units
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LppValue {
    AnalogInput(f32),
    Illuminance(f32),
    Temperature(f32),
    RelativeHumidity(f32),
    Accelerometer { x: f32, y: f32, z: f32 },
}

impl LppValue {
    /// Type of this value
    pub fn lpp_type(&self) -> LppType {
        match self {
            LppValue::AnalogInput(_) => LppType::AnalogInput,
            LppValue::Illuminance(_) => LppType::Illuminance,
            LppValue::Temperature(_) => LppType::Temperature,
            LppValue::RelativeHumidity(_) => LppType::RelativeHumidity,
            LppValue::Accelerometer { .. } => LppType::Accelerometer,
        }
    }
}

/// One channel-tagged, type-tagged record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LppRecord {
    pub channel: u8,
    pub value: LppValue,
}

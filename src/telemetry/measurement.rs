//! Typed measurements and their fixed channel assignments.

use serde::{Deserialize, Serialize};

use crate::lpp::protocol::LppType;

/// Modulus applied to the counter on the wire
///
/// The counter rides an analog input (hundredths, signed 16-bit), whose
/// largest value is 327.67. Wrapping at 328 keeps every transmitted count
/// integral: 327 is followed by 0.
pub const COUNTER_WIRE_MODULUS: u32 = 328;

/// Kinds of measurement the node can report
///
/// Channel ids are a contract with the downstream payload decoder and must
/// not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementKind {
    Pitch,
    Roll,
    Temperature,
    Acceleration,
    Altitude,
    Luminosity,
    Humidity,
    BatteryVoltage,
    Counter,
}

impl MeasurementKind {
    /// Default payload layout, in transmission order
    pub const DEFAULT_LAYOUT: [MeasurementKind; 9] = [
        MeasurementKind::Pitch,
        MeasurementKind::Roll,
        MeasurementKind::Temperature,
        MeasurementKind::Acceleration,
        MeasurementKind::Altitude,
        MeasurementKind::Luminosity,
        MeasurementKind::Humidity,
        MeasurementKind::BatteryVoltage,
        MeasurementKind::Counter,
    ];

    /// Cayenne LPP channel id
    pub fn channel(self) -> u8 {
        match self {
            MeasurementKind::Pitch => 1,
            MeasurementKind::Roll => 103,
            MeasurementKind::Temperature => 107,
            MeasurementKind::Acceleration => 1,
            MeasurementKind::Altitude => 104,
            MeasurementKind::Luminosity => 1,
            MeasurementKind::Humidity => 1,
            MeasurementKind::BatteryVoltage => 105,
            MeasurementKind::Counter => 106,
        }
    }

    /// Cayenne LPP type used on the wire
    pub fn lpp_type(self) -> LppType {
        match self {
            MeasurementKind::Pitch
            | MeasurementKind::Roll
            | MeasurementKind::Altitude
            | MeasurementKind::BatteryVoltage
            | MeasurementKind::Counter => LppType::AnalogInput,
            MeasurementKind::Temperature => LppType::Temperature,
            MeasurementKind::Acceleration => LppType::Accelerometer,
            MeasurementKind::Luminosity => LppType::Illuminance,
            MeasurementKind::Humidity => LppType::RelativeHumidity,
        }
    }

    /// Worst-case encoded size of one record of this kind
    pub fn encoded_size(self) -> usize {
        self.lpp_type().record_size()
    }
}

/// A single reading in physical units
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Measurement {
    /// Degrees
    Pitch(f32),
    /// Degrees
    Roll(f32),
    /// Degrees Celsius
    Temperature(f32),
    /// g per axis
    Acceleration { x: f32, y: f32, z: f32 },
    /// Meters
    Altitude(f32),
    /// Lux
    Luminosity(f32),
    /// Percent relative humidity
    Humidity(f32),
    /// Volts
    BatteryVoltage(f32),
    /// Cycle count
    Counter(u32),
}

impl Measurement {
    pub fn kind(&self) -> MeasurementKind {
        match self {
            Measurement::Pitch(_) => MeasurementKind::Pitch,
            Measurement::Roll(_) => MeasurementKind::Roll,
            Measurement::Temperature(_) => MeasurementKind::Temperature,
            Measurement::Acceleration { .. } => MeasurementKind::Acceleration,
            Measurement::Altitude(_) => MeasurementKind::Altitude,
            Measurement::Luminosity(_) => MeasurementKind::Luminosity,
            Measurement::Humidity(_) => MeasurementKind::Humidity,
            Measurement::BatteryVoltage(_) => MeasurementKind::BatteryVoltage,
            Measurement::Counter(_) => MeasurementKind::Counter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_channel_contract() {
        assert_eq!(MeasurementKind::Pitch.channel(), 1);
        assert_eq!(MeasurementKind::Roll.channel(), 103);
        assert_eq!(MeasurementKind::Altitude.channel(), 104);
        assert_eq!(MeasurementKind::BatteryVoltage.channel(), 105);
        assert_eq!(MeasurementKind::Counter.channel(), 106);
        assert_eq!(MeasurementKind::Temperature.channel(), 107);
    }

    #[test]
    fn test_default_layout_has_unique_channel_type_pairs() {
        let pairs: HashSet<(u8, u8)> = MeasurementKind::DEFAULT_LAYOUT
            .iter()
            .map(|k| (k.channel(), k.lpp_type().id()))
            .collect();
        assert_eq!(pairs.len(), MeasurementKind::DEFAULT_LAYOUT.len());
    }

    #[test]
    fn test_default_layout_size() {
        let size: usize = MeasurementKind::DEFAULT_LAYOUT
            .iter()
            .map(|k| k.encoded_size())
            .sum();
        // 5 analog (4) + temperature (4) + accel (8) + illuminance (4) + humidity (3)
        assert_eq!(size, 39);
    }

    #[test]
    fn test_measurement_kind() {
        assert_eq!(Measurement::Counter(7).kind(), MeasurementKind::Counter);
        assert_eq!(
            Measurement::Acceleration { x: 0.0, y: 0.0, z: 1.0 }.kind(),
            MeasurementKind::Acceleration
        );
    }

    #[test]
    fn test_kind_deserializes_snake_case() {
        #[derive(Deserialize)]
        struct Fields {
            fields: Vec<MeasurementKind>,
        }
        let parsed: Fields = toml::from_str(r#"fields = ["pitch", "battery_voltage"]"#).unwrap();
        assert_eq!(
            parsed.fields,
            vec![MeasurementKind::Pitch, MeasurementKind::BatteryVoltage]
        );
    }
}

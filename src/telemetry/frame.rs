//! # Telemetry Frame Encoder
//!
//! Builds one Cayenne LPP frame per cycle from typed measurements.
//!
//! The measurement set is validated once at startup: the worst-case encoded
//! size must fit in the maximum payload size, and no two kinds may share a
//! (channel, type) pair. After that, per-cycle encoding cannot overflow.

use std::collections::HashSet;

use super::measurement::{Measurement, MeasurementKind, COUNTER_WIRE_MODULUS};
use crate::error::{NodeError, Result};
use crate::lpp::encoder::LppBuffer;

/// Validated payload layout
#[derive(Debug, Clone)]
pub struct PayloadEncoder {
    layout: Vec<MeasurementKind>,
    max_size: usize,
}

impl PayloadEncoder {
    /// Validate a measurement layout against a maximum payload size
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Config`] if:
    /// - The layout is empty or repeats a kind
    /// - Two kinds share a (channel, type) pair
    /// - The worst-case encoded size exceeds `max_size`
    pub fn new(layout: &[MeasurementKind], max_size: usize) -> Result<Self> {
        if layout.is_empty() {
            return Err(NodeError::Config("payload layout cannot be empty".to_string()));
        }

        let mut kinds = HashSet::new();
        let mut slots = HashSet::new();
        for &kind in layout {
            if !kinds.insert(kind) {
                return Err(NodeError::Config(format!(
                    "measurement {:?} appears more than once in the payload layout",
                    kind
                )));
            }
            if !slots.insert((kind.channel(), kind.lpp_type())) {
                return Err(NodeError::Config(format!(
                    "measurement {:?} reuses channel {} for type {:?}",
                    kind,
                    kind.channel(),
                    kind.lpp_type()
                )));
            }
        }

        let worst_case = worst_case_size(layout);
        if worst_case > max_size {
            return Err(NodeError::Config(format!(
                "payload layout needs up to {} bytes, maximum is {}",
                worst_case, max_size
            )));
        }

        Ok(Self {
            layout: layout.to_vec(),
            max_size,
        })
    }

    /// Measurement kinds in transmission order
    pub fn layout(&self) -> &[MeasurementKind] {
        &self.layout
    }

    /// Maximum payload size in bytes
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Worst-case frame size for this layout
    pub fn frame_size(&self) -> usize {
        worst_case_size(&self.layout)
    }

    /// Encode measurements in the order given
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Payload`] if a measurement kind is not part of
    /// the validated layout.
    pub fn encode(&self, measurements: &[Measurement]) -> Result<Vec<u8>> {
        let mut lpp = LppBuffer::new(self.max_size);

        for measurement in measurements {
            let kind = measurement.kind();
            if !self.layout.contains(&kind) {
                return Err(NodeError::Payload(format!(
                    "measurement {:?} is not part of the payload layout",
                    kind
                )));
            }

            let channel = kind.channel();
            match *measurement {
                Measurement::Pitch(v)
                | Measurement::Roll(v)
                | Measurement::Altitude(v)
                | Measurement::BatteryVoltage(v) => lpp.add_analog_input(channel, v)?,
                Measurement::Counter(count) => {
                    lpp.add_analog_input(channel, (count % COUNTER_WIRE_MODULUS) as f32)?
                }
                Measurement::Temperature(v) => lpp.add_temperature(channel, v)?,
                Measurement::Acceleration { x, y, z } => lpp.add_accelerometer(channel, x, y, z)?,
                Measurement::Luminosity(v) => lpp.add_illuminance(channel, v)?,
                Measurement::Humidity(v) => lpp.add_relative_humidity(channel, v)?,
            }
        }

        Ok(lpp.into_bytes())
    }
}

/// Worst-case encoded size of a layout
pub fn worst_case_size(layout: &[MeasurementKind]) -> usize {
    layout.iter().map(|kind| kind.encoded_size()).sum()
}

/// Encode an ad-hoc measurement set, validating it against `max_size` first
///
/// # Examples
///
/// ```
/// use lora_sensor_node::telemetry::frame::encode;
/// use lora_sensor_node::telemetry::measurement::Measurement;
///
/// let frame = encode(&[Measurement::BatteryVoltage(3.7), Measurement::Counter(7)], 60).unwrap();
/// assert_eq!(frame.len(), 8);
/// ```
pub fn encode(measurements: &[Measurement], max_size: usize) -> Result<Vec<u8>> {
    let layout: Vec<MeasurementKind> = measurements.iter().map(|m| m.kind()).collect();
    PayloadEncoder::new(&layout, max_size)?.encode(measurements)
}

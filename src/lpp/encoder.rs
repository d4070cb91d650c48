//! # Cayenne LPP Encoder
//!
//! Appends channel-tagged, type-tagged records to a size-bounded buffer.

use bytes::{BufMut, BytesMut};
use tracing::warn;

use super::protocol::*;
use crate::error::{NodeError, Result};

/// Size-bounded Cayenne LPP payload builder
///
/// # Examples
///
/// ```
/// use lora_sensor_node::lpp::encoder::LppBuffer;
///
/// let mut lpp = LppBuffer::new(60);
/// lpp.add_analog_input(1, 12.34).unwrap();
/// lpp.add_temperature(107, 21.5).unwrap();
/// assert_eq!(lpp.len(), 8);
/// ```
#[derive(Debug, Clone)]
pub struct LppBuffer {
    buffer: BytesMut,
    max_size: usize,
}

impl LppBuffer {
    /// Create an empty buffer that never grows beyond `max_size` bytes
    pub fn new(max_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(max_size),
            max_size,
        }
    }

    /// Current payload size in bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether no record has been added yet
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Maximum payload size in bytes
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Add an analog input (0.01 resolution, signed)
    pub fn add_analog_input(&mut self, channel: u8, value: f32) -> Result<()> {
        self.begin_record(channel, LppType::AnalogInput)?;
        self.buffer
            .put_i16(scale_i16(value, LPP_ANALOG_INPUT_MULTIPLIER, "analog input"));
        Ok(())
    }

    /// Add an illuminance value in lux (1 lux resolution, unsigned)
    pub fn add_illuminance(&mut self, channel: u8, lux: f32) -> Result<()> {
        self.begin_record(channel, LppType::Illuminance)?;
        self.buffer
            .put_u16(scale_u16(lux, LPP_ILLUMINANCE_MULTIPLIER, "illuminance"));
        Ok(())
    }

    /// Add a temperature in °C (0.1 resolution, signed)
    pub fn add_temperature(&mut self, channel: u8, celsius: f32) -> Result<()> {
        self.begin_record(channel, LppType::Temperature)?;
        self.buffer
            .put_i16(scale_i16(celsius, LPP_TEMPERATURE_MULTIPLIER, "temperature"));
        Ok(())
    }

    /// Add a relative humidity in % (0.5 resolution, unsigned)
    pub fn add_relative_humidity(&mut self, channel: u8, percent: f32) -> Result<()> {
        self.begin_record(channel, LppType::RelativeHumidity)?;
        self.buffer
            .put_u8(scale_u8(percent, LPP_RELATIVE_HUMIDITY_MULTIPLIER, "humidity"));
        Ok(())
    }

    /// Add an accelerometer triple in g (0.001 resolution, signed per axis)
    pub fn add_accelerometer(&mut self, channel: u8, x: f32, y: f32, z: f32) -> Result<()> {
        self.begin_record(channel, LppType::Accelerometer)?;
        for axis in [x, y, z] {
            self.buffer
                .put_i16(scale_i16(axis, LPP_ACCELEROMETER_MULTIPLIER, "acceleration"));
        }
        Ok(())
    }

    /// Add any decoded value
    pub fn add_value(&mut self, channel: u8, value: LppValue) -> Result<()> {
        match value {
            LppValue::AnalogInput(v) => self.add_analog_input(channel, v),
            LppValue::Illuminance(v) => self.add_illuminance(channel, v),
            LppValue::Temperature(v) => self.add_temperature(channel, v),
            LppValue::RelativeHumidity(v) => self.add_relative_humidity(channel, v),
            LppValue::Accelerometer { x, y, z } => self.add_accelerometer(channel, x, y, z),
        }
    }

    /// Finish the payload
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.to_vec()
    }

    fn begin_record(&mut self, channel: u8, lpp_type: LppType) -> Result<()> {
        let needed = self.buffer.len() + lpp_type.record_size();
        if needed > self.max_size {
            return Err(NodeError::Payload(format!(
                "Adding {:?} on channel {} needs {} bytes, maximum is {}",
                lpp_type, channel, needed, self.max_size
            )));
        }

        self.buffer.put_u8(channel);
        self.buffer.put_u8(lpp_type.id());
        Ok(())
    }
}

/// Scale and round to i16, saturating at the range limits
fn scale_i16(value: f32, multiplier: f32, what: &str) -> i16 {
    let scaled = (value * multiplier).round();
    let clamped = scaled.clamp(i16::MIN as f32, i16::MAX as f32);
    if clamped != scaled {
        warn!("{} value {} out of range, saturating", what, value);
    }
    // NaN casts to 0
    clamped as i16
}

/// Scale and round to u16, saturating at the range limits
fn scale_u16(value: f32, multiplier: f32, what: &str) -> u16 {
    let scaled = (value * multiplier).round();
    let clamped = scaled.clamp(0.0, u16::MAX as f32);
    if clamped != scaled {
        warn!("{} value {} out of range, saturating", what, value);
    }
    clamped as u16
}

/// Scale and round to u8, saturating at the range limits
fn scale_u8(value: f32, multiplier: f32, what: &str) -> u8 {
    let scaled = (value * multiplier).round();
    let clamped = scaled.clamp(0.0, u8::MAX as f32);
    if clamped != scaled {
        warn!("{} value {} out of range, saturating", what, value);
    }
    clamped as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analog_input_bytes() {
        let mut lpp = LppBuffer::new(LPP_DEFAULT_MAX_SIZE);
        lpp.add_analog_input(1, 12.34).unwrap();

        // 1234 = 0x04D2
        assert_eq!(lpp.into_bytes(), vec![0x01, 0x02, 0x04, 0xD2]);
    }

    #[test]
    fn test_negative_analog_input_bytes() {
        let mut lpp = LppBuffer::new(LPP_DEFAULT_MAX_SIZE);
        lpp.add_analog_input(103, -5.0).unwrap();

        // -500 = 0xFE0C
        assert_eq!(lpp.into_bytes(), vec![103, 0x02, 0xFE, 0x0C]);
    }

    #[test]
    fn test_temperature_bytes() {
        let mut lpp = LppBuffer::new(LPP_DEFAULT_MAX_SIZE);
        lpp.add_temperature(107, 27.2).unwrap();

        // 272 = 0x0110
        assert_eq!(lpp.into_bytes(), vec![107, 103, 0x01, 0x10]);
    }

    #[test]
    fn test_humidity_bytes() {
        let mut lpp = LppBuffer::new(LPP_DEFAULT_MAX_SIZE);
        lpp.add_relative_humidity(1, 41.5).unwrap();

        assert_eq!(lpp.into_bytes(), vec![1, 104, 83]);
    }

    #[test]
    fn test_illuminance_bytes() {
        let mut lpp = LppBuffer::new(LPP_DEFAULT_MAX_SIZE);
        lpp.add_illuminance(1, 300.4).unwrap();

        // 300 = 0x012C
        assert_eq!(lpp.into_bytes(), vec![1, 101, 0x01, 0x2C]);
    }

    #[test]
    fn test_accelerometer_bytes() {
        let mut lpp = LppBuffer::new(LPP_DEFAULT_MAX_SIZE);
        lpp.add_accelerometer(1, 0.1, -0.2, 9.8).unwrap();

        // 100 = 0x0064, -200 = 0xFF38, 9800 = 0x2648
        assert_eq!(
            lpp.into_bytes(),
            vec![1, 113, 0x00, 0x64, 0xFF, 0x38, 0x26, 0x48]
        );
    }

    #[test]
    fn test_saturates_out_of_range_values() {
        let mut lpp = LppBuffer::new(LPP_DEFAULT_MAX_SIZE);
        lpp.add_analog_input(104, 1000.0).unwrap();
        lpp.add_analog_input(104, -1000.0).unwrap();
        lpp.add_relative_humidity(1, 200.0).unwrap();
        lpp.add_illuminance(1, -3.0).unwrap();

        let bytes = lpp.into_bytes();
        assert_eq!(&bytes[2..4], &i16::MAX.to_be_bytes());
        assert_eq!(&bytes[6..8], &i16::MIN.to_be_bytes());
        assert_eq!(bytes[10], u8::MAX);
        assert_eq!(&bytes[13..15], &[0, 0]);
    }

    #[test]
    fn test_nan_encodes_as_zero() {
        let mut lpp = LppBuffer::new(LPP_DEFAULT_MAX_SIZE);
        lpp.add_analog_input(1, f32::NAN).unwrap();
        assert_eq!(lpp.into_bytes(), vec![1, 2, 0, 0]);
    }

    #[test]
    fn test_rejects_record_beyond_max_size() {
        let mut lpp = LppBuffer::new(10);
        lpp.add_accelerometer(1, 0.0, 0.0, 1.0).unwrap();
        assert_eq!(lpp.len(), 8);

        let result = lpp.add_analog_input(2, 1.0);
        assert!(matches!(result, Err(NodeError::Payload(_))));

        // Failed add leaves the buffer untouched
        assert_eq!(lpp.len(), 8);
    }

    #[test]
    fn test_exact_fit_is_accepted() {
        let mut lpp = LppBuffer::new(7);
        lpp.add_analog_input(1, 1.0).unwrap();
        lpp.add_relative_humidity(1, 50.0).unwrap();
        assert_eq!(lpp.len(), 7);
    }

    #[test]
    fn test_identical_inputs_give_identical_bytes() {
        let build = || {
            let mut lpp = LppBuffer::new(LPP_DEFAULT_MAX_SIZE);
            lpp.add_analog_input(1, 3.7).unwrap();
            lpp.add_accelerometer(1, 0.01, 0.02, 0.98).unwrap();
            lpp.into_bytes()
        };
        assert_eq!(build(), build());
    }
}

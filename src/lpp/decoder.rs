//! # Cayenne LPP Decoder
//!
//! Parses a payload back into channel/type/value records, the way the
//! network-side payload formatter reads it.

use bytes::Buf;

use super::protocol::*;
use crate::error::{NodeError, Result};

/// Decode a complete Cayenne LPP payload
///
/// # Arguments
///
/// * `payload` - Payload bytes as transmitted
///
/// # Returns
///
/// * `Result<Vec<LppRecord>>` - Records in payload order
///
/// # Errors
///
/// Returns error if:
/// - A type id is unknown
/// - A record is truncated
pub fn decode_payload(payload: &[u8]) -> Result<Vec<LppRecord>> {
    let mut buf = payload;
    let mut records = Vec::new();

    while buf.has_remaining() {
        if buf.remaining() < LPP_RECORD_HEADER_SIZE {
            return Err(NodeError::Payload(format!(
                "Truncated record header at offset {}",
                payload.len() - buf.remaining()
            )));
        }

        let channel = buf.get_u8();
        let type_id = buf.get_u8();
        let lpp_type = LppType::from_id(type_id).ok_or_else(|| {
            NodeError::Payload(format!("Unknown LPP type id: {}", type_id))
        })?;

        if buf.remaining() < lpp_type.data_size() {
            return Err(NodeError::Payload(format!(
                "Truncated {:?} record on channel {}: {} of {} bytes",
                lpp_type,
                channel,
                buf.remaining(),
                lpp_type.data_size()
            )));
        }

        let value = match lpp_type {
            LppType::AnalogInput => {
                LppValue::AnalogInput(buf.get_i16() as f32 / LPP_ANALOG_INPUT_MULTIPLIER)
            }
            LppType::Illuminance => {
                LppValue::Illuminance(buf.get_u16() as f32 / LPP_ILLUMINANCE_MULTIPLIER)
            }
            LppType::Temperature => {
                LppValue::Temperature(buf.get_i16() as f32 / LPP_TEMPERATURE_MULTIPLIER)
            }
            LppType::RelativeHumidity => LppValue::RelativeHumidity(
                buf.get_u8() as f32 / LPP_RELATIVE_HUMIDITY_MULTIPLIER,
            ),
            LppType::Accelerometer => LppValue::Accelerometer {
                x: buf.get_i16() as f32 / LPP_ACCELEROMETER_MULTIPLIER,
                y: buf.get_i16() as f32 / LPP_ACCELEROMETER_MULTIPLIER,
                z: buf.get_i16() as f32 / LPP_ACCELEROMETER_MULTIPLIER,
            },
        };

        records.push(LppRecord { channel, value });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lpp::encoder::LppBuffer;

    #[test]
    fn test_decode_empty_payload() {
        assert!(decode_payload(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_decode_known_bytes() {
        let payload = [
            0x01, 0x02, 0x04, 0xD2, // ch1 analog 12.34
            107, 103, 0x01, 0x10, // ch107 temperature 27.2
            0x01, 104, 83, // ch1 humidity 41.5
        ];

        let records = decode_payload(&payload).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].channel, 1);
        assert_eq!(records[0].value, LppValue::AnalogInput(12.34));
        assert_eq!(records[1].channel, 107);
        assert_eq!(records[1].value, LppValue::Temperature(27.2));
        assert_eq!(records[2].value, LppValue::RelativeHumidity(41.5));
    }

    #[test]
    fn test_decode_encoded_accelerometer() {
        let mut lpp = LppBuffer::new(LPP_DEFAULT_MAX_SIZE);
        lpp.add_accelerometer(1, 0.1, -0.2, 9.8).unwrap();

        let records = decode_payload(&lpp.into_bytes()).unwrap();
        match records[0].value {
            LppValue::Accelerometer { x, y, z } => {
                assert!((x - 0.1).abs() <= 0.001);
                assert!((y + 0.2).abs() <= 0.001);
                assert!((z - 9.8).abs() <= 0.001);
            }
            other => panic!("Expected accelerometer, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_type() {
        let result = decode_payload(&[0x01, 0xEE, 0x00, 0x00]);
        assert!(matches!(result, Err(NodeError::Payload(_))));
    }

    #[test]
    fn test_decode_truncated_header() {
        let result = decode_payload(&[0x01, 0x02, 0x00, 0x10, 0x05]);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_truncated_data() {
        // Accelerometer needs 6 data bytes
        let result = decode_payload(&[0x01, 113, 0x00, 0x64, 0xFF]);
        match result {
            Err(NodeError::Payload(msg)) => assert!(msg.contains("Truncated")),
            other => panic!("Expected truncation error, got {:?}", other),
        }
    }
}

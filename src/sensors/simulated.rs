//! Deterministic sensor suite for bench runs without a sensor board.

use super::{BaroMode, BaroReading, LightReading, MotionReading, SensorSuite};

/// Sea-level standard pressure in pascals
const SEA_LEVEL_PRESSURE_PA: f32 = 101_325.0;

/// Simulated sensor board
///
/// Values drift slowly around a resting node on a desk so that successive
/// frames differ while staying inside every payload type's range.
#[derive(Debug, Clone)]
pub struct SimulatedSensors {
    baro_mode: BaroMode,
    altitude_m: f32,
    cycles: u32,
}

impl SimulatedSensors {
    pub fn new(baro_mode: BaroMode, altitude_m: f32) -> Self {
        Self {
            baro_mode,
            altitude_m,
            cycles: 0,
        }
    }

    fn phase(&self) -> f32 {
        (self.cycles as f32 * 0.1).sin()
    }
}

impl SensorSuite for SimulatedSensors {
    fn begin_cycle(&mut self) {
        self.cycles = self.cycles.wrapping_add(1);
    }

    fn read_motion(&mut self) -> MotionReading {
        let wobble = self.phase();
        MotionReading {
            pitch: 1.5 * wobble,
            roll: -0.8 * wobble,
            acceleration: [0.01 * wobble, -0.02 * wobble, 1.0],
        }
    }

    fn read_barometer(&mut self) -> BaroReading {
        let wobble = self.phase();
        let value = match self.baro_mode {
            BaroMode::Altitude => self.altitude_m + 0.5 * wobble,
            // Barometric formula, troposphere approximation
            BaroMode::Pressure => {
                SEA_LEVEL_PRESSURE_PA * (1.0 - 2.255_77e-5 * self.altitude_m).powf(5.255_88)
            }
        };
        BaroReading {
            value,
            temperature: 22.0 + wobble,
        }
    }

    fn read_light(&mut self) -> LightReading {
        let wobble = self.phase();
        LightReading {
            channel0: 320.0 + 40.0 * wobble,
            channel1: 280.0 + 40.0 * wobble,
        }
    }

    fn read_humidity(&mut self) -> f32 {
        45.0 + 5.0 * self.phase()
    }

    fn read_battery_voltage(&mut self) -> f32 {
        // Slow discharge, floored at a nearly flat LiPo cell
        (4.15 - self.cycles as f32 * 0.0005).max(3.3)
    }
}

//! # Send Pipeline
//!
//! One telemetry cycle: sample, encode, transmit, then report status.
//!
//! ```text
//! Idle -> Sampling -> Encoding -> Sending -> Idle
//!                                    |        |
//!                                    |        +-> Cancelled   (operator request)
//!                                    +-> FatalRestart         (send failure)
//! ```
//!
//! The pipeline is the [`Cycle`] registered with the scheduler, so at most
//! one instance of it runs at a time and it owns its counter outright.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::frame::PayloadEncoder;
use super::journal::FrameJournal;
use super::measurement::{Measurement, MeasurementKind};
use crate::error::{NodeError, Result};
use crate::link::Link;
use crate::operator::OperatorCancel;
use crate::scheduler::{Cycle, SchedulerHandle};
use crate::sensors::{BaroReading, LightReading, MotionReading, SensorSuite};
use crate::status::{Notifier, StatusKind};

/// Pipeline lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Sampling,
    Encoding,
    Sending,
    Cancelled,
    FatalRestart,
}

/// Observable pipeline progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSnapshot {
    pub state: PipelineState,
    /// Cycles started; the value carried by the last encoded frame
    pub counter: u32,
    pub frames_sent: u64,
}

/// Sensor reads memoized for one cycle
struct Readings<'a> {
    sensors: &'a mut dyn SensorSuite,
    motion: Option<MotionReading>,
    baro: Option<BaroReading>,
    light: Option<LightReading>,
}

impl<'a> Readings<'a> {
    fn new(sensors: &'a mut dyn SensorSuite) -> Self {
        Self {
            sensors,
            motion: None,
            baro: None,
            light: None,
        }
    }

    fn motion(&mut self) -> MotionReading {
        match self.motion {
            Some(reading) => reading,
            None => {
                let reading = self.sensors.read_motion();
                self.motion = Some(reading);
                reading
            }
        }
    }

    fn baro(&mut self) -> BaroReading {
        match self.baro {
            Some(reading) => reading,
            None => {
                let reading = self.sensors.read_barometer();
                self.baro = Some(reading);
                reading
            }
        }
    }

    fn light(&mut self) -> LightReading {
        match self.light {
            Some(reading) => reading,
            None => {
                let reading = self.sensors.read_light();
                self.light = Some(reading);
                reading
            }
        }
    }
}

/// Sample-encode-send cycle
pub struct SendPipeline<L> {
    sensors: Box<dyn SensorSuite>,
    link: L,
    notifier: Arc<dyn Notifier>,
    operator: Box<dyn OperatorCancel>,
    encoder: PayloadEncoder,
    journal: Option<FrameJournal>,
    snapshot: watch::Sender<PipelineSnapshot>,
}

impl<L: Link> SendPipeline<L> {
    /// Create a pipeline over an already joined link
    pub fn new(
        sensors: Box<dyn SensorSuite>,
        link: L,
        notifier: Arc<dyn Notifier>,
        operator: Box<dyn OperatorCancel>,
        encoder: PayloadEncoder,
    ) -> Self {
        let (snapshot, _) = watch::channel(PipelineSnapshot {
            state: PipelineState::Idle,
            counter: 0,
            frames_sent: 0,
        });

        Self {
            sensors,
            link,
            notifier,
            operator,
            encoder,
            journal: None,
            snapshot,
        }
    }

    /// Record every transmitted frame to `journal`
    pub fn with_journal(mut self, journal: FrameJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Subscribe to state and counter updates
    pub fn monitor(&self) -> watch::Receiver<PipelineSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        *self.snapshot.borrow()
    }

    fn set_state(&self, state: PipelineState) {
        self.snapshot.send_modify(|s| s.state = state);
    }

    /// Read the sensors the layout needs and bump the counter
    fn sample(&mut self) -> Vec<Measurement> {
        let counter = self.snapshot.borrow().counter.wrapping_add(1);
        self.snapshot.send_modify(|s| s.counter = counter);

        self.sensors.begin_cycle();
        let mut readings = Readings::new(self.sensors.as_mut());
        let measurements: Vec<Measurement> = self
            .encoder
            .layout()
            .iter()
            .map(|kind| match kind {
                MeasurementKind::Pitch => Measurement::Pitch(readings.motion().pitch),
                MeasurementKind::Roll => Measurement::Roll(readings.motion().roll),
                MeasurementKind::Acceleration => {
                    let [x, y, z] = readings.motion().acceleration;
                    Measurement::Acceleration { x, y, z }
                }
                MeasurementKind::Temperature => Measurement::Temperature(readings.baro().temperature),
                MeasurementKind::Altitude => Measurement::Altitude(readings.baro().value),
                MeasurementKind::Luminosity => Measurement::Luminosity(readings.light().average()),
                MeasurementKind::Humidity => Measurement::Humidity(readings.sensors.read_humidity()),
                MeasurementKind::BatteryVoltage => {
                    Measurement::BatteryVoltage(readings.sensors.read_battery_voltage())
                }
                MeasurementKind::Counter => Measurement::Counter(counter),
            })
            .collect();

        for measurement in &measurements {
            info!("{}", describe(measurement));
        }

        measurements
    }

    /// Run one full cycle
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Transmit`] after signalling the error pattern
    /// when the uplink fails. The caller must restart the process.
    pub async fn run_cycle(&mut self, scheduler: &SchedulerHandle) -> Result<()> {
        info!("Sending...");

        self.set_state(PipelineState::Sampling);
        let measurements = self.sample();

        self.set_state(PipelineState::Encoding);
        let frame = self.encoder.encode(&measurements)?;
        debug!("Payload size: {} bytes", frame.len());

        self.set_state(PipelineState::Sending);
        if let Err(e) = self.link.send(&frame).await {
            error!("Uplink failed: {}", e);
            self.set_state(PipelineState::FatalRestart);
            self.notifier.signal(StatusKind::Error).await;
            return Err(NodeError::Transmit(e));
        }

        let counter = self.snapshot.borrow().counter;
        self.snapshot.send_modify(|s| s.frames_sent += 1);
        info!("Sent frame {} ({} bytes)", counter, frame.len());

        if let Some(journal) = self.journal.as_mut() {
            if let Err(e) = journal.record(counter, &frame, &measurements) {
                warn!("Failed to write frame journal {}: {}", journal.path().display(), e);
            }
        }

        self.set_state(PipelineState::Idle);
        self.notifier.signal(StatusKind::Success).await;

        if self.operator.is_cancel_requested() {
            info!("Sending cancelled by operator");
            scheduler.cancel();
            self.set_state(PipelineState::Cancelled);
            self.notifier.signal(StatusKind::Cancelled).await;
        }

        Ok(())
    }
}

#[async_trait]
impl<L: Link + 'static> Cycle for SendPipeline<L> {
    async fn run(&mut self, scheduler: &SchedulerHandle) -> Result<()> {
        self.run_cycle(scheduler).await
    }
}

fn describe(measurement: &Measurement) -> String {
    match measurement {
        Measurement::Pitch(v) => format!("Pitch: {:.2} deg", v),
        Measurement::Roll(v) => format!("Roll: {:.2} deg", v),
        Measurement::Temperature(v) => format!("Temperature: {:.1} C", v),
        Measurement::Acceleration { x, y, z } => {
            format!("Acceleration: x={:.3} y={:.3} z={:.3} g", x, y, z)
        }
        Measurement::Altitude(v) => format!("Altitude: {:.2} m", v),
        Measurement::Luminosity(v) => format!("Luminosity: {:.0} lux", v),
        Measurement::Humidity(v) => format!("Humidity: {:.1} %", v),
        Measurement::BatteryVoltage(v) => format!("Battery: {:.2} V", v),
        Measurement::Counter(v) => format!("Counter: {}", v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::mocks::MockLink;
    use crate::lpp::decoder::decode_payload;
    use crate::lpp::protocol::LppValue;
    use crate::operator::MockOperatorCancel;
    use crate::scheduler::Scheduler;
    use crate::sensors::{BaroMode, MockSensorSuite, SimulatedSensors};
    use crate::status::mocks::RecordingNotifier;
    use std::io;

    fn mock_sensors() -> MockSensorSuite {
        let mut sensors = MockSensorSuite::new();
        sensors.expect_begin_cycle().returning(|| ());
        sensors.expect_read_motion().returning(|| MotionReading {
            pitch: 12.34,
            roll: -5.0,
            acceleration: [0.1, -0.2, 0.98],
        });
        sensors.expect_read_barometer().returning(|| BaroReading {
            value: 120.5,
            temperature: 21.3,
        });
        sensors.expect_read_light().returning(|| LightReading {
            channel0: 300.0,
            channel1: 500.0,
        });
        sensors.expect_read_humidity().returning(|| 45.5);
        sensors.expect_read_battery_voltage().returning(|| 3.7);
        sensors
    }

    fn operator(cancel: bool) -> MockOperatorCancel {
        let mut operator = MockOperatorCancel::new();
        operator.expect_is_cancel_requested().returning(move || cancel);
        operator
    }

    fn pipeline(
        link: MockLink,
        notifier: RecordingNotifier,
        cancel: bool,
        layout: &[MeasurementKind],
    ) -> SendPipeline<MockLink> {
        SendPipeline::new(
            Box::new(mock_sensors()),
            link,
            Arc::new(notifier),
            Box::new(operator(cancel)),
            PayloadEncoder::new(layout, 60).unwrap(),
        )
    }

    fn scheduler_handle() -> SchedulerHandle {
        struct Idle;

        #[async_trait]
        impl Cycle for Idle {
            async fn run(&mut self, _scheduler: &SchedulerHandle) -> Result<()> {
                Ok(())
            }
        }

        Scheduler::start(Idle).handle()
    }

    fn counter_of(frame: &[u8]) -> f32 {
        decode_payload(frame)
            .unwrap()
            .into_iter()
            .find(|r| r.channel == MeasurementKind::Counter.channel())
            .map(|r| match r.value {
                LppValue::AnalogInput(v) => v,
                other => panic!("Unexpected counter value {:?}", other),
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_successful_cycle_sends_full_frame() {
        let link = MockLink::new();
        let notifier = RecordingNotifier::new();
        let mut pipeline = pipeline(link.clone(), notifier.clone(), false, &MeasurementKind::DEFAULT_LAYOUT);
        let handle = scheduler_handle();

        pipeline.run_cycle(&handle).await.unwrap();

        let frames = link.sent_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 39);
        assert_eq!(counter_of(&frames[0]), 1.0);
        assert_eq!(notifier.get_signals(), vec![StatusKind::Success]);
        assert!(!handle.is_cancelled());

        let snapshot = pipeline.snapshot();
        assert_eq!(snapshot.state, PipelineState::Idle);
        assert_eq!(snapshot.counter, 1);
        assert_eq!(snapshot.frames_sent, 1);
    }

    #[tokio::test]
    async fn test_frame_carries_sampled_values() {
        let link = MockLink::new();
        let mut pipeline = pipeline(
            link.clone(),
            RecordingNotifier::new(),
            false,
            &[MeasurementKind::Temperature, MeasurementKind::Luminosity, MeasurementKind::Humidity],
        );

        pipeline.run_cycle(&scheduler_handle()).await.unwrap();

        let records = decode_payload(&link.sent_frames()[0]).unwrap();
        assert_eq!(records[0].value, LppValue::Temperature(21.3));
        assert_eq!(records[1].value, LppValue::Illuminance(400.0));
        assert_eq!(records[2].value, LppValue::RelativeHumidity(45.5));
    }

    #[tokio::test]
    async fn test_counter_increments_each_cycle() {
        let link = MockLink::new();
        let mut pipeline = pipeline(
            link.clone(),
            RecordingNotifier::new(),
            false,
            &[MeasurementKind::Counter],
        );
        let handle = scheduler_handle();

        for _ in 0..3 {
            pipeline.run_cycle(&handle).await.unwrap();
        }

        let counters: Vec<f32> = link.sent_frames().iter().map(|f| counter_of(f)).collect();
        assert_eq!(counters, vec![1.0, 2.0, 3.0]);
        assert_eq!(pipeline.snapshot().counter, 3);
    }

    #[tokio::test]
    async fn test_unneeded_sensors_are_not_read() {
        let mut sensors = MockSensorSuite::new();
        sensors.expect_begin_cycle().times(1).returning(|| ());
        sensors.expect_read_battery_voltage().times(1).returning(|| 3.9);
        sensors.expect_read_motion().never();
        sensors.expect_read_barometer().never();
        sensors.expect_read_light().never();
        sensors.expect_read_humidity().never();

        let mut pipeline = SendPipeline::new(
            Box::new(sensors),
            MockLink::new(),
            Arc::new(RecordingNotifier::new()),
            Box::new(operator(false)),
            PayloadEncoder::new(&[MeasurementKind::BatteryVoltage], 60).unwrap(),
        );

        pipeline.run_cycle(&scheduler_handle()).await.unwrap();
    }

    #[tokio::test]
    async fn test_motion_read_once_per_cycle() {
        let mut sensors = MockSensorSuite::new();
        sensors.expect_begin_cycle().times(1).returning(|| ());
        sensors.expect_read_motion().times(1).returning(|| MotionReading {
            pitch: 1.0,
            roll: 2.0,
            acceleration: [0.0, 0.0, 1.0],
        });

        let mut pipeline = SendPipeline::new(
            Box::new(sensors),
            MockLink::new(),
            Arc::new(RecordingNotifier::new()),
            Box::new(operator(false)),
            PayloadEncoder::new(
                &[MeasurementKind::Pitch, MeasurementKind::Roll, MeasurementKind::Acceleration],
                60,
            )
            .unwrap(),
        );

        pipeline.run_cycle(&scheduler_handle()).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_failure_signals_error_once() {
        let link = MockLink::new();
        link.set_send_error(io::ErrorKind::TimedOut);
        let notifier = RecordingNotifier::new();
        let mut pipeline = pipeline(link.clone(), notifier.clone(), true, &MeasurementKind::DEFAULT_LAYOUT);
        let handle = scheduler_handle();

        let result = pipeline.run_cycle(&handle).await;

        match result {
            Err(NodeError::Transmit(e)) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
            other => panic!("Expected Transmit error, got {:?}", other),
        }
        assert_eq!(notifier.get_signals(), vec![StatusKind::Error]);
        assert_eq!(pipeline.snapshot().state, PipelineState::FatalRestart);
        assert_eq!(pipeline.snapshot().frames_sent, 0);
        // Operator cancel is not consulted after a failed send
        assert!(!handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_operator_cancel_after_success() {
        let link = MockLink::new();
        let notifier = RecordingNotifier::new();
        let mut pipeline = pipeline(link.clone(), notifier.clone(), true, &[MeasurementKind::Counter]);
        let handle = scheduler_handle();

        pipeline.run_cycle(&handle).await.unwrap();

        assert_eq!(link.sent_frames().len(), 1);
        assert_eq!(
            notifier.get_signals(),
            vec![StatusKind::Success, StatusKind::Cancelled]
        );
        assert!(handle.is_cancelled());
        assert_eq!(pipeline.snapshot().state, PipelineState::Cancelled);
    }

    #[tokio::test]
    async fn test_monitor_observes_progress() {
        let mut pipeline = pipeline(
            MockLink::new(),
            RecordingNotifier::new(),
            false,
            &[MeasurementKind::Counter],
        );
        let mut monitor = pipeline.monitor();

        pipeline.run_cycle(&scheduler_handle()).await.unwrap();

        assert!(monitor.has_changed().unwrap());
        let seen = *monitor.borrow_and_update();
        assert_eq!(seen.counter, 1);
        assert_eq!(seen.frames_sent, 1);
    }

    #[tokio::test]
    async fn test_journal_records_sent_frames() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("frames.jsonl");
        let mut pipeline = pipeline(
            MockLink::new(),
            RecordingNotifier::new(),
            false,
            &[MeasurementKind::Counter],
        )
        .with_journal(FrameJournal::open(&path).unwrap());
        let handle = scheduler_handle();

        pipeline.run_cycle(&handle).await.unwrap();
        pipeline.run_cycle(&handle).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("\"payload_hex\":\"6A020064\""));
        assert!(contents.contains("\"payload_hex\":\"6A0200C8\""));
    }

    #[tokio::test]
    async fn test_simulated_frames_differ_without_motion_fields() {
        let link = MockLink::new();
        let mut pipeline = SendPipeline::new(
            Box::new(SimulatedSensors::new(BaroMode::Altitude, 50.0)),
            link.clone(),
            Arc::new(RecordingNotifier::new()),
            Box::new(operator(false)),
            PayloadEncoder::new(
                &[MeasurementKind::Luminosity, MeasurementKind::Humidity, MeasurementKind::Temperature],
                60,
            )
            .unwrap(),
        );
        let handle = scheduler_handle();

        pipeline.run_cycle(&handle).await.unwrap();
        pipeline.run_cycle(&handle).await.unwrap();

        let frames = link.sent_frames();
        assert_ne!(frames[0], frames[1]);
    }

    #[test]
    fn test_describe_formats_units() {
        assert_eq!(describe(&Measurement::BatteryVoltage(3.7)), "Battery: 3.70 V");
        assert_eq!(describe(&Measurement::Counter(7)), "Counter: 7");
        assert_eq!(describe(&Measurement::Pitch(12.345)), "Pitch: 12.35 deg");
    }
}

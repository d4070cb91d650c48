//! # Telemetry Module
//!
//! Turns sensor readings into uplink frames.
//!
//! This module handles:
//! - Typed measurements and their fixed channel map
//! - Building Cayenne LPP frames from a configured layout
//! - The per-cycle send pipeline
//! - Journaling transmitted frames to JSONL

pub mod frame;
pub mod journal;
pub mod measurement;
pub mod pipeline;

pub use frame::PayloadEncoder;
pub use measurement::{Measurement, MeasurementKind};
pub use pipeline::{PipelineSnapshot, PipelineState, SendPipeline};

//! # LoRa Sensor Node Library
//!
//! Sample an onboard sensor suite and uplink the readings as Cayenne LPP
//! frames over LoRaWAN (US915/AU915, OTAA).
//!
//! This library provides the building blocks for the node: the payload
//! encoder, the connectivity manager and modem link, the telemetry
//! scheduler, and the per-cycle send pipeline.

pub mod config;
pub mod error;
pub mod hex;
pub mod link;
pub mod lpp;
pub mod node;
pub mod operator;
pub mod restart;
pub mod scheduler;
pub mod sensors;
pub mod serial;
pub mod status;
pub mod telemetry;

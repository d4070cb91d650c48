//! # Cayenne LPP Module
//!
//! Implementation of the Cayenne Low Power Payload format.
//!
//! This module handles:
//! - Type ids, record sizes and resolutions
//! - Size-bounded payload encoding with saturation
//! - Decoding payloads back into records

pub mod protocol;
pub mod encoder;
pub mod decoder;

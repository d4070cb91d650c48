//! # Regional Channel Plans
//!
//! Channel masks, data rates and OTAA credentials for the 72-channel
//! LoRaWAN regions (US915, AU915).
//!
//! Channels 0-63 are 125 kHz uplink channels, 64-71 are 500 kHz channels.
//! Sub-band `n` (1-8) groups 125 kHz channels `8(n-1)..=8(n-1)+7` with
//! 500 kHz channel `64+(n-1)`.

use serde::Deserialize;

use crate::error::{NodeError, Result};
use crate::hex::parse_hex;

/// Number of uplink channels in a 72-channel plan
pub const REGION_CHANNEL_COUNT: u8 = 72;

/// Number of 125 kHz channels
const NARROW_CHANNEL_COUNT: u8 = 64;

/// Channels per sub-band (125 kHz)
const SUB_BAND_WIDTH: u8 = 8;

/// Number of sub-bands
pub const SUB_BAND_COUNT: u8 = 8;

/// US915 maximum application payload per data rate (DR0-DR4)
const US915_MAX_PAYLOAD: [usize; 5] = [11, 53, 125, 242, 242];

/// AU915 maximum application payload per data rate (DR0-DR6)
const AU915_MAX_PAYLOAD: [usize; 7] = [51, 51, 51, 115, 222, 222, 222];

/// LoRaWAN region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Region {
    #[serde(rename = "US915")]
    Us915,
    #[serde(rename = "AU915")]
    Au915,
}

impl Region {
    fn payload_table(self) -> &'static [usize] {
        match self {
            Region::Us915 => &US915_MAX_PAYLOAD,
            Region::Au915 => &AU915_MAX_PAYLOAD,
        }
    }

    /// Highest valid uplink data rate index
    pub fn max_data_rate(self) -> u8 {
        (self.payload_table().len() - 1) as u8
    }
}

/// Uplink data rate index, validated for a region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRate {
    region: Region,
    index: u8,
}

impl DataRate {
    /// # Errors
    ///
    /// Returns [`NodeError::Config`] if `index` is not an uplink data rate of
    /// `region`
    pub fn new(region: Region, index: u8) -> Result<Self> {
        if index > region.max_data_rate() {
            return Err(NodeError::Config(format!(
                "data rate DR{} is not valid for {:?} (DR0-DR{})",
                index,
                region,
                region.max_data_rate()
            )));
        }
        Ok(Self { region, index })
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    /// Largest application payload this data rate can carry
    pub fn max_payload(&self) -> usize {
        self.region.payload_table()[self.index as usize]
    }
}

/// 72-bit channel enable mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelMask(u128);

impl ChannelMask {
    /// Mask with every channel disabled
    pub fn none() -> Self {
        Self(0)
    }

    /// Mask enabling exactly one sub-band
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Config`] if `sub_band` is not 1-8
    pub fn for_sub_band(sub_band: u8) -> Result<Self> {
        if sub_band == 0 || sub_band > SUB_BAND_COUNT {
            return Err(NodeError::Config(format!(
                "sub_band must be between 1 and {}, got {}",
                SUB_BAND_COUNT, sub_band
            )));
        }

        let mut mask = Self::none();
        let first = (sub_band - 1) * SUB_BAND_WIDTH;
        for channel in first..first + SUB_BAND_WIDTH {
            mask.enable(channel);
        }
        mask.enable(NARROW_CHANNEL_COUNT + sub_band - 1);
        Ok(mask)
    }

    /// Enable a channel; channels beyond the plan are ignored
    pub fn enable(&mut self, channel: u8) {
        if channel < REGION_CHANNEL_COUNT {
            self.0 |= 1u128 << channel;
        }
    }

    pub fn is_enabled(&self, channel: u8) -> bool {
        channel < REGION_CHANNEL_COUNT && self.0 & (1u128 << channel) != 0
    }

    pub fn enabled_channels(&self) -> Vec<u8> {
        (0..REGION_CHANNEL_COUNT).filter(|&ch| self.is_enabled(ch)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Over-the-air activation credentials
#[derive(Clone, PartialEq, Eq)]
pub struct OtaaCredentials {
    pub app_eui: [u8; 8],
    pub app_key: [u8; 16],
    /// Device EUI; the radio's hardware EUI is used when absent
    pub dev_eui: Option<[u8; 8]>,
}

impl OtaaCredentials {
    /// Parse credentials from hex strings
    pub fn from_hex(app_eui: &str, app_key: &str, dev_eui: Option<&str>) -> Result<Self> {
        Ok(Self {
            app_eui: parse_hex("app_eui", app_eui)?,
            app_key: parse_hex("app_key", app_key)?,
            dev_eui: dev_eui.map(|eui| parse_hex("dev_eui", eui)).transpose()?,
        })
    }
}

impl std::fmt::Debug for OtaaCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtaaCredentials")
            .field("app_eui", &crate::hex::to_hex(&self.app_eui))
            .field("dev_eui", &self.dev_eui.map(|eui| crate::hex::to_hex(&eui)))
            .finish_non_exhaustive()
    }
}

//! # LoRaWAN Link Module
//!
//! Connectivity with the network server.
//!
//! This module handles:
//! - The link collaborator trait (region, join, data rate, send)
//! - The join state machine and poll loop ([`ConnectivityManager`])
//! - Regional channel plans and data rates
//! - A serial LoRaWAN modem implementation of the link

pub mod manager;
pub mod modem;
pub mod region;

pub use manager::{ConnectionState, ConnectivityManager, JoinSettings};
pub use region::{ChannelMask, DataRate, OtaaCredentials, Region};

use async_trait::async_trait;
use std::io;

use crate::error::Result;

/// Radio link collaborator
///
/// Models a connectionless datagram socket bound to a regional sub-band and
/// a fixed data rate. Join completion is observed by polling.
#[async_trait]
pub trait Link: Send {
    /// Disable every channel not enabled in `mask`
    async fn configure_region(&mut self, mask: &ChannelMask) -> Result<()>;

    /// Start an OTAA join; returns without waiting for completion
    async fn begin_join(&mut self, credentials: &OtaaCredentials) -> Result<()>;

    /// Whether the join handshake has completed
    async fn poll_joined(&mut self) -> Result<bool>;

    /// Set the uplink data rate
    async fn set_data_rate(&mut self, rate: DataRate) -> Result<()>;

    /// Send one uplink frame
    async fn send(&mut self, payload: &[u8]) -> io::Result<()>;
}

#[async_trait]
impl<L: Link + ?Sized> Link for Box<L> {
    async fn configure_region(&mut self, mask: &ChannelMask) -> Result<()> {
        (**self).configure_region(mask).await
    }

    async fn begin_join(&mut self, credentials: &OtaaCredentials) -> Result<()> {
        (**self).begin_join(credentials).await
    }

    async fn poll_joined(&mut self) -> Result<bool> {
        (**self).poll_joined().await
    }

    async fn set_data_rate(&mut self, rate: DataRate) -> Result<()> {
        (**self).set_data_rate(rate).await
    }

    async fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        (**self).send(payload).await
    }
}

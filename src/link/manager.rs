//! # Connectivity Manager
//!
//! Drives the join handshake and owns the connection state:
//!
//! ```text
//! Unjoined --begin_join()--> Joining --poll: joined?--> Joined
//! ```
//!
//! The only backwards transition is an explicit re-join from `Joined`.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{ChannelMask, DataRate, Link, OtaaCredentials};
use crate::error::{NodeError, Result};
use crate::status::{Notifier, StatusKind};

/// Default interval between join polls
pub const DEFAULT_JOIN_POLL_INTERVAL: Duration = Duration::from_millis(2500);

/// Join handshake state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unjoined,
    Joining,
    Joined,
}

/// Join poll loop settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinSettings {
    pub poll_interval: Duration,
    /// `None` polls forever
    pub timeout: Option<Duration>,
}

impl Default for JoinSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_JOIN_POLL_INTERVAL,
            timeout: None,
        }
    }
}

/// Join state machine wrapped around a [`Link`]
pub struct ConnectivityManager<L> {
    link: L,
    state: ConnectionState,
    region_configured: bool,
    deadline: Option<(Instant, Duration)>,
}

impl<L> std::fmt::Debug for ConnectivityManager<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityManager")
            .field("state", &self.state)
            .field("region_configured", &self.region_configured)
            .finish_non_exhaustive()
    }
}

impl<L: Link> ConnectivityManager<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            state: ConnectionState::Unjoined,
            region_configured: false,
            deadline: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Restrict the radio to the operative sub-band
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Config`] if the mask is empty or a join is
    /// already in progress
    pub async fn configure_region(&mut self, mask: &ChannelMask) -> Result<()> {
        if mask.is_empty() {
            return Err(NodeError::Config("channel mask enables no channels".to_string()));
        }
        if self.state == ConnectionState::Joining {
            return Err(NodeError::Config(
                "channel plan cannot change while joining".to_string(),
            ));
        }

        self.link.configure_region(mask).await?;
        self.region_configured = true;
        info!("Channel plan set: {:?}", mask.enabled_channels());
        Ok(())
    }

    /// Start the OTAA handshake
    ///
    /// Calling this from `Joined` is an explicit re-join.
    ///
    /// # Arguments
    ///
    /// * `credentials` - OTAA keys
    /// * `timeout` - Give up polling after this long; `None` never gives up
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Config`] if the region has not been configured
    pub async fn begin_join(
        &mut self,
        credentials: &OtaaCredentials,
        timeout: Option<Duration>,
    ) -> Result<()> {
        if !self.region_configured {
            return Err(NodeError::Config(
                "configure_region must be called before begin_join".to_string(),
            ));
        }

        self.link.begin_join(credentials).await?;
        self.state = ConnectionState::Joining;
        self.deadline = timeout.map(|t| (Instant::now() + t, t));
        info!("OTAA join started");
        Ok(())
    }

    /// Check whether the handshake has completed
    ///
    /// # Errors
    ///
    /// - [`NodeError::Link`] if no join was started
    /// - [`NodeError::JoinTimeout`] once the join timeout has elapsed
    pub async fn poll_joined(&mut self) -> Result<bool> {
        match self.state {
            ConnectionState::Joined => return Ok(true),
            ConnectionState::Unjoined => {
                return Err(NodeError::Link("join has not been started".to_string()))
            }
            ConnectionState::Joining => {}
        }

        if self.link.poll_joined().await? {
            self.state = ConnectionState::Joined;
            self.deadline = None;
            info!("Joined the network");
            return Ok(true);
        }

        if let Some((deadline, timeout)) = self.deadline {
            if Instant::now() >= deadline {
                return Err(NodeError::JoinTimeout(timeout));
            }
        }
        Ok(false)
    }

    /// Set the uplink data rate
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Config`] if called before the node has joined
    pub async fn set_data_rate(&mut self, rate: DataRate) -> Result<()> {
        if self.state != ConnectionState::Joined {
            return Err(NodeError::Config(format!(
                "data rate can only be set after joining (state: {:?})",
                self.state
            )));
        }

        self.link.set_data_rate(rate).await?;
        info!("Data rate set to DR{}", rate.index());
        Ok(())
    }

    /// Join and wait, signalling `waiting` on every unsuccessful poll
    ///
    /// Blocks the caller between polls; this runs once at startup before
    /// periodic sending begins.
    pub async fn join(
        &mut self,
        credentials: &OtaaCredentials,
        settings: &JoinSettings,
        notifier: &dyn Notifier,
    ) -> Result<()> {
        self.begin_join(credentials, settings.timeout).await?;

        let mut polls: u64 = 0;
        loop {
            if self.poll_joined().await? {
                debug!("Join completed after {} unsuccessful polls", polls);
                notifier.signal(StatusKind::Joined).await;
                return Ok(());
            }

            polls += 1;
            notifier.signal(StatusKind::Waiting).await;
            if polls % 24 == 0 {
                warn!("Still waiting for join accept after {} polls", polls);
            }
            tokio::time::sleep(settings.poll_interval).await;
        }
    }

    /// Hand over the link once joined
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Link`] if the node has not joined
    pub fn into_link(self) -> Result<L> {
        if self.state != ConnectionState::Joined {
            return Err(NodeError::Link(format!(
                "link is not joined (state: {:?})",
                self.state
            )));
        }
        Ok(self.link)
    }
}

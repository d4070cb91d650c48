//! # Node Root
//!
//! Brings the node from power-on to periodic sending:
//!
//! 1. Restrict the radio to the configured sub-band
//! 2. Join over OTAA, signalling `waiting` until accepted
//! 3. Set the uplink data rate
//! 4. Register the send pipeline with the scheduler (one shot, then periodic)
//!
//! Everything the node owns lives in the values built here; a fatal restart
//! discards them all and the next start begins from `Unjoined` again.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{NodeError, Result};
use crate::link::{ChannelMask, ConnectivityManager, DataRate, JoinSettings, Link, OtaaCredentials};
use crate::operator::OperatorCancel;
use crate::scheduler::{Scheduler, SchedulerHandle};
use crate::sensors::SensorSuite;
use crate::status::Notifier;
use crate::telemetry::journal::FrameJournal;
use crate::telemetry::{PayloadEncoder, PipelineSnapshot, SendPipeline};

/// Everything needed to bring the node up
#[derive(Debug, Clone)]
pub struct NodeSettings {
    pub channel_mask: ChannelMask,
    pub credentials: OtaaCredentials,
    pub join: JoinSettings,
    pub data_rate: DataRate,
    pub encoder: PayloadEncoder,
    pub initial_delay: Duration,
    pub period: Duration,
    pub journal: Option<PathBuf>,
}

impl NodeSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            channel_mask: config.channel_mask()?,
            credentials: config.credentials()?,
            join: config.join_settings(),
            data_rate: config.data_rate()?,
            encoder: config.payload_encoder()?,
            initial_delay: config.initial_delay(),
            period: config.period(),
            journal: config
                .journal
                .enabled
                .then(|| PathBuf::from(&config.journal.path)),
        })
    }
}

/// Collaborators handed to the node at start
pub struct Collaborators<L> {
    pub link: L,
    pub sensors: Box<dyn SensorSuite>,
    pub notifier: Arc<dyn Notifier>,
    pub operator: Box<dyn OperatorCancel>,
}

/// Why a running node stopped
#[derive(Debug)]
pub enum NodeExit {
    /// The operator cancelled sending; the node stays idle until restarted
    Cancelled,
    /// An unrecoverable failure; the process must restart
    Restart(NodeError),
}

/// A joined node with its scheduler running
pub struct Node {
    scheduler: Scheduler,
    monitor: watch::Receiver<PipelineSnapshot>,
}

impl Node {
    /// Configure, join, and start periodic sending
    ///
    /// # Errors
    ///
    /// - [`NodeError::Config`] if the payload layout does not fit the data rate
    /// - [`NodeError::JoinTimeout`] if a join timeout is set and expires
    /// - Any link error raised while configuring or joining
    pub async fn start<L: Link + 'static>(settings: NodeSettings, parts: Collaborators<L>) -> Result<Self> {
        if settings.encoder.frame_size() > settings.data_rate.max_payload() {
            return Err(NodeError::Config(format!(
                "payload layout needs up to {} bytes but DR{} carries at most {}",
                settings.encoder.frame_size(),
                settings.data_rate.index(),
                settings.data_rate.max_payload()
            )));
        }

        let mut manager = ConnectivityManager::new(parts.link);
        manager.configure_region(&settings.channel_mask).await?;
        manager
            .join(&settings.credentials, &settings.join, parts.notifier.as_ref())
            .await?;
        manager.set_data_rate(settings.data_rate).await?;
        let link = manager.into_link()?;

        let mut pipeline = SendPipeline::new(
            parts.sensors,
            link,
            parts.notifier,
            parts.operator,
            settings.encoder,
        );
        if let Some(path) = &settings.journal {
            match FrameJournal::open(path) {
                Ok(journal) => pipeline = pipeline.with_journal(journal),
                Err(e) => warn!("Frame journal disabled, cannot open {}: {}", path.display(), e),
            }
        }
        let monitor = pipeline.monitor();

        let mut scheduler = Scheduler::start(pipeline);
        scheduler.schedule_once(settings.initial_delay);
        scheduler.schedule_periodic(settings.period);
        info!(
            "Sending every {:?} (first frame in {:?})",
            settings.period, settings.initial_delay
        );

        Ok(Self { scheduler, monitor })
    }

    pub fn monitor(&self) -> watch::Receiver<PipelineSnapshot> {
        self.monitor.clone()
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.scheduler.handle()
    }

    /// Wait for the scheduler to stop and classify why
    pub async fn wait(self) -> Result<NodeExit> {
        classify(self.scheduler.wait().await)
    }

    /// Stop sending without waiting for a running cycle
    pub fn shutdown(self) {
        self.scheduler.shutdown();
    }
}

/// Start the node and run it until it stops
///
/// Failures that call for a restart are returned as
/// `Ok(NodeExit::Restart(_))`; anything else is an error.
pub async fn run<L: Link + 'static>(settings: NodeSettings, parts: Collaborators<L>) -> Result<NodeExit> {
    match Node::start(settings, parts).await {
        Ok(node) => node.wait().await,
        Err(e) => classify(Err(e)),
    }
}

fn classify(result: Result<()>) -> Result<NodeExit> {
    match result {
        Ok(()) => Ok(NodeExit::Cancelled),
        Err(e) if e.is_fatal_restart() => Ok(NodeExit::Restart(e)),
        Err(e) => Err(e),
    }
}

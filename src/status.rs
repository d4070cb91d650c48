//! # Status Indication
//!
//! Side-effect-only status signalling for the join and send lifecycle.
//!
//! Each status has a blink pattern. A node with an RGB LED renders it on the
//! LED; the default [`LogNotifier`] logs the status and, if enabled, holds
//! for the pattern's duration so the cycle timing matches an LED node.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info, warn};

/// Status reported to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// Join handshake not yet complete
    Waiting,
    /// Join handshake completed
    Joined,
    /// Frame sent
    Success,
    /// Frame transmission failed, restart follows
    Error,
    /// Sending cancelled by the operator
    Cancelled,
}

/// RGB colors used by the blink patterns
pub const COLOR_YELLOW: u32 = 0xFFFF00;
pub const COLOR_GREEN: u32 = 0x00FF00;
pub const COLOR_BLUE: u32 = 0x0000FF;
pub const COLOR_RED: u32 = 0xFF0000;

/// Number of red pulses shown before a fatal restart
pub const ERROR_BLINK_PULSES: u32 = 10;

/// A bounded blink sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkPattern {
    pub color: u32,
    pub on: Duration,
    pub off: Duration,
    pub pulses: u32,
}

impl BlinkPattern {
    /// Total time the pattern takes to render
    pub fn duration(&self) -> Duration {
        (self.on + self.off) * self.pulses
    }
}

impl StatusKind {
    pub fn pattern(self) -> BlinkPattern {
        match self {
            StatusKind::Waiting => BlinkPattern {
                color: COLOR_YELLOW,
                on: Duration::from_millis(200),
                off: Duration::ZERO,
                pulses: 1,
            },
            StatusKind::Joined => BlinkPattern {
                color: COLOR_BLUE,
                on: Duration::from_millis(200),
                off: Duration::ZERO,
                pulses: 1,
            },
            StatusKind::Success => BlinkPattern {
                color: COLOR_GREEN,
                on: Duration::from_millis(200),
                off: Duration::ZERO,
                pulses: 1,
            },
            StatusKind::Error => BlinkPattern {
                color: COLOR_RED,
                on: Duration::from_millis(200),
                off: Duration::from_millis(200),
                pulses: ERROR_BLINK_PULSES,
            },
            StatusKind::Cancelled => BlinkPattern {
                color: COLOR_RED,
                on: Duration::from_secs(5),
                off: Duration::ZERO,
                pulses: 1,
            },
        }
    }
}

/// Status notifier collaborator
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Signal a status; returns once the indication has been rendered
    async fn signal(&self, kind: StatusKind);
}

/// Notifier that reports status through `tracing`
#[derive(Debug, Clone)]
pub struct LogNotifier {
    render_patterns: bool,
}

impl LogNotifier {
    /// Create a notifier
    ///
    /// # Arguments
    ///
    /// * `render_patterns` - Hold for each pattern's duration after logging
    pub fn new(render_patterns: bool) -> Self {
        Self { render_patterns }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn signal(&self, kind: StatusKind) {
        let pattern = kind.pattern();
        match kind {
            StatusKind::Waiting => info!("Not yet joined..."),
            StatusKind::Joined => info!("Status: joined"),
            StatusKind::Success => info!("Status: success"),
            StatusKind::Error => error!(
                "Status: error ({} pulses of #{:06X})",
                pattern.pulses, pattern.color
            ),
            StatusKind::Cancelled => warn!("Status: sending cancelled until restart"),
        }

        if self.render_patterns {
            tokio::time::sleep(pattern.duration()).await;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_pattern_is_bounded() {
        let pattern = StatusKind::Error.pattern();
        assert_eq!(pattern.color, COLOR_RED);
        assert_eq!(pattern.pulses, 10);
        assert_eq!(pattern.duration(), Duration::from_secs(4));
    }

    #[test]
    fn test_pattern_colors() {
        assert_eq!(StatusKind::Waiting.pattern().color, COLOR_YELLOW);
        assert_eq!(StatusKind::Joined.pattern().color, COLOR_BLUE);
        assert_eq!(StatusKind::Success.pattern().color, COLOR_GREEN);
        assert_eq!(StatusKind::Cancelled.pattern().color, COLOR_RED);
        assert_eq!(StatusKind::Cancelled.pattern().duration(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_notifier_holds_for_pattern() {
        let notifier = LogNotifier::new(true);
        let start = tokio::time::Instant::now();
        notifier.signal(StatusKind::Error).await;
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_notifier_without_rendering_returns_immediately() {
        let notifier = LogNotifier::new(false);
        let start = tokio::time::Instant::now();
        notifier.signal(StatusKind::Cancelled).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}

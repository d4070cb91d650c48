//! # Operator Cancel
//!
//! The operator can stop all further sending until the node restarts. The
//! pipeline polls the request once per cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Operator-cancel collaborator
#[cfg_attr(test, mockall::automock)]
pub trait OperatorCancel: Send {
    fn is_cancel_requested(&self) -> bool;
}

/// Cancel request latched from a Unix signal (SIGUSR1)
///
/// Stands in for holding the board button down: once the signal has been
/// received the request stays asserted.
#[derive(Debug, Clone, Default)]
pub struct SignalCancel {
    requested: Arc<AtomicBool>,
}

impl SignalCancel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert the cancel request
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Spawn a task that asserts the request on SIGUSR1
    ///
    /// # Errors
    ///
    /// Returns error if the signal handler cannot be installed
    #[cfg(unix)]
    pub fn listen(&self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};
        use tracing::info;

        let mut usr1 = signal(SignalKind::user_defined1())?;
        let this = self.clone();
        tokio::spawn(async move {
            if usr1.recv().await.is_some() {
                info!("Operator cancel requested (SIGUSR1)");
                this.request();
            }
        });
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn listen(&self) -> std::io::Result<()> {
        tracing::warn!("Operator cancel signal is not supported on this platform");
        Ok(())
    }
}

impl OperatorCancel for SignalCancel {
    fn is_cancel_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_requested_by_default() {
        assert!(!SignalCancel::new().is_cancel_requested());
    }

    #[test]
    fn test_request_latches() {
        let cancel = SignalCancel::new();
        let clone = cancel.clone();
        clone.request();
        assert!(cancel.is_cancel_requested());
        assert!(cancel.is_cancel_requested());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sigusr1_asserts_request() {
        let cancel = SignalCancel::new();
        cancel.listen().unwrap();

        let pid = std::process::id().to_string();
        let status = std::process::Command::new("kill")
            .args(["-USR1", &pid])
            .status()
            .unwrap();
        assert!(status.success());

        for _ in 0..100 {
            if cancel.is_cancel_requested() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(cancel.is_cancel_requested());
    }
}
